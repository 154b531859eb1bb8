use directories::ProjectDirs;
use std::path::PathBuf;

/// Overrides every resolved location; used by tests and portable installs.
pub const HOME_ENV: &str = "STUDYSYNC_HOME";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Directory holding mutable state: the key-value file, the database and logs
    pub fn state_dir() -> PathBuf {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return PathBuf::from(home);
        }
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("studysync")
        } else {
            ProjectDirs::from("", "", "studysync")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".studysync"))
        }
    }

    pub fn storage_path() -> PathBuf {
        Self::state_dir().join("storage.json")
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("studysync.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("studysync.log")
    }

    pub fn config_path() -> PathBuf {
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return PathBuf::from(home).join("config.json");
        }
        if let Some(pd) = ProjectDirs::from("", "", "studysync") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("studysync_config.json")
        }
    }
}

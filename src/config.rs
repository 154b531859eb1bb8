use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::timer_state::TimerMode;

/// Countdown lengths in minutes for the non-stopwatch modes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Durations {
    pub pomodoro: u64,
    pub short_break: u64,
    pub long_break: u64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            pomodoro: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_subject: String,
    /// Mode an idle timer starts in
    pub default_mode: TimerMode,
    pub durations: Durations,
    /// Display refresh cadence for the running timer
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_subject: "math".to_string(),
            default_mode: TimerMode::Stopwatch,
            durations: Durations::default(),
            tick_rate_ms: 16,
        }
    }
}

impl Config {
    /// Countdown target for `mode`; the stopwatch counts up and has none.
    pub fn target_ms(&self, mode: TimerMode) -> Option<u64> {
        let minutes = match mode {
            TimerMode::Stopwatch => return None,
            TimerMode::Pomodoro => self.durations.pomodoro,
            TimerMode::ShortBreak => self.durations.short_break,
            TimerMode::LongBreak => self.durations.long_break,
        };
        Some(minutes.saturating_mul(60_000))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            default_subject: "cs".into(),
            default_mode: TimerMode::Pomodoro,
            durations: Durations {
                pomodoro: 50,
                short_break: 10,
                long_break: 30,
            },
            tick_rate_ms: 100,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn corrupt_or_partial_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());

        fs::write(&path, br#"{"default_subject":"phys","default_mode":"long-break"}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.default_subject, "phys");
        assert_eq!(cfg.default_mode, TimerMode::LongBreak);
        assert_eq!(cfg.durations, Durations::default());
    }

    #[test]
    fn target_ms_per_mode() {
        let cfg = Config::default();
        assert_eq!(cfg.target_ms(TimerMode::Stopwatch), None);
        assert_eq!(cfg.target_ms(TimerMode::Pomodoro), Some(25 * 60_000));
        assert_eq!(cfg.target_ms(TimerMode::ShortBreak), Some(5 * 60_000));
        assert_eq!(cfg.target_ms(TimerMode::LongBreak), Some(15 * 60_000));
    }
}

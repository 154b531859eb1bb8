use rusqlite::{params, types::Type, Connection, Result, Row};
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::models::{default_subjects, DailyGoal, Exam, Subject, Task};
use crate::session::{SessionSink, StudySession};

/// Bumped whenever the schema changes
const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        end_time INTEGER NOT NULL,
        duration_ms INTEGER NOT NULL,
        date_string TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date_string);

    CREATE TABLE IF NOT EXISTS subjects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        color TEXT NOT NULL,
        is_archived BOOLEAN NOT NULL DEFAULT 0,
        position INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS goals (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        is_completed BOOLEAN NOT NULL,
        date_string TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_goals_date ON goals(date_string);

    CREATE TABLE IF NOT EXISTS exams (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL,
        title TEXT NOT NULL,
        date TEXT NOT NULL,
        topics TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        status TEXT NOT NULL,
        subject_id TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        sort_order INTEGER NOT NULL
    );
"#;

/// Tables emptied by a history clear, all keyed by `date_string`
const HISTORY_TABLES: [&str; 2] = ["sessions", "goals"];

/// Which part of the history a bulk clear removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearScope {
    /// Sessions and goals of one `YYYY-MM-DD` day
    Day(String),
    All,
}

/// Local database of sessions, subjects, goals and exams
#[derive(Debug)]
pub struct StudyDb {
    conn: Connection,
}

impl StudyDb {
    /// Open the database in the application state directory
    pub fn new() -> Result<Self> {
        Self::open(AppDirs::db_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;

        // Defaults are only seeded on first creation so deleting them sticks.
        if version == 0 {
            for (position, subject) in default_subjects().iter().enumerate() {
                conn.execute(
                    "INSERT OR IGNORE INTO subjects (id, name, color, is_archived, position)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        subject.id,
                        subject.name,
                        subject.color,
                        subject.is_archived,
                        position as i64
                    ],
                )?;
            }
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(StudyDb { conn })
    }

    // --- Sessions ---

    pub fn save_session(&self, session: &StudySession) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO sessions
            (id, subject_id, start_time, end_time, duration_ms, date_string)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.id,
                session.subject_id,
                session.start_time,
                session.end_time,
                session.duration_ms,
                session.date_string,
            ],
        )?;
        Ok(())
    }

    pub fn sessions_by_date(&self, date: &str) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, subject_id, start_time, end_time, duration_ms, date_string
            FROM sessions
            WHERE date_string = ?1
            ORDER BY start_time
            "#,
        )?;
        let rows = stmt.query_map([date], session_from_row)?;
        rows.collect()
    }

    pub fn all_sessions(&self) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, subject_id, start_time, end_time, duration_ms, date_string
            FROM sessions
            ORDER BY start_time
            "#,
        )?;
        let rows = stmt.query_map([], session_from_row)?;
        rows.collect()
    }

    // --- Subjects ---

    /// Every stored subject in creation order; the built-in set when none are stored
    pub fn subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, is_archived FROM subjects ORDER BY position, rowid",
        )?;
        let subjects = stmt
            .query_map([], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    is_archived: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        if subjects.is_empty() {
            Ok(default_subjects())
        } else {
            Ok(subjects)
        }
    }

    /// Insert or update by id; an existing subject keeps its position
    pub fn save_subject(&self, subject: &Subject) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO subjects (id, name, color, is_archived, position)
            VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(position), -1) + 1 FROM subjects))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                color = excluded.color,
                is_archived = excluded.is_archived
            "#,
            params![subject.id, subject.name, subject.color, subject.is_archived],
        )?;
        Ok(())
    }

    /// Sessions recorded against the subject are left in place
    pub fn delete_subject(&self, id: &str) -> Result<usize> {
        self.conn.execute("DELETE FROM subjects WHERE id = ?1", [id])
    }

    // --- Goals ---

    pub fn goals_by_date(&self, date: &str) -> Result<Vec<DailyGoal>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, text, is_completed, date_string, created_at
            FROM goals
            WHERE date_string = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([date], |row| {
            Ok(DailyGoal {
                id: row.get(0)?,
                text: row.get(1)?,
                is_completed: row.get(2)?,
                date_string: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    pub fn save_goal(&self, goal: &DailyGoal) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO goals (id, text, is_completed, date_string, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                goal.id,
                goal.text,
                goal.is_completed,
                goal.date_string,
                goal.created_at
            ],
        )?;
        Ok(())
    }

    pub fn set_goal_completed(&self, id: &str, completed: bool) -> Result<usize> {
        self.conn.execute(
            "UPDATE goals SET is_completed = ?2 WHERE id = ?1",
            params![id, completed],
        )
    }

    pub fn delete_goal(&self, id: &str) -> Result<usize> {
        self.conn.execute("DELETE FROM goals WHERE id = ?1", [id])
    }

    // --- Exams ---

    pub fn exams(&self) -> Result<Vec<Exam>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, subject_id, title, date, topics FROM exams ORDER BY date, title")?;
        let rows = stmt.query_map([], |row| {
            Ok(Exam {
                id: row.get(0)?,
                subject_id: row.get(1)?,
                title: row.get(2)?,
                date: row.get(3)?,
                topics: row.get(4)?,
            })
        })?;
        rows.collect()
    }

    pub fn save_exam(&self, exam: &Exam) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO exams (id, subject_id, title, date, topics)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![exam.id, exam.subject_id, exam.title, exam.date, exam.topics],
        )?;
        Ok(())
    }

    pub fn delete_exam(&self, id: &str) -> Result<usize> {
        self.conn.execute("DELETE FROM exams WHERE id = ?1", [id])
    }

    // --- Tasks ---

    /// Whole board, column by column in card order
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, title, status, subject_id, created_at, updated_at, sort_order
            FROM tasks
            ORDER BY sort_order, created_at
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(2)?;
            Ok(Task {
                id: row.get(0)?,
                title: row.get(1)?,
                status: status
                    .parse()
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
                subject_id: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                order: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    pub fn save_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO tasks
            (id, title, status, subject_id, created_at, updated_at, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                task.id,
                task.title,
                task.status.to_string(),
                task.subject_id,
                task.created_at,
                task.updated_at,
                task.order,
            ],
        )?;
        Ok(())
    }

    pub fn delete_task(&self, id: &str) -> Result<usize> {
        self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])
    }

    // --- Bulk history ---

    /// Remove sessions and goals together in one transaction
    pub fn clear_history(&mut self, scope: &ClearScope) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in HISTORY_TABLES {
            match scope {
                ClearScope::Day(date) => {
                    tx.execute(&format!("DELETE FROM {table} WHERE date_string = ?1"), [date])?
                }
                ClearScope::All => tx.execute(&format!("DELETE FROM {table}"), [])?,
            };
        }
        tx.commit()
    }
}

fn session_from_row(row: &Row<'_>) -> Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        duration_ms: row.get(4)?,
        date_string: row.get(5)?,
    })
}

impl SessionSink for StudyDb {
    fn create(&self, session: &StudySession) -> crate::error::Result<()> {
        Ok(self.save_session(session)?)
    }
}

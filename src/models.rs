use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// Fallback color for subjects that no longer exist
pub const FALLBACK_COLOR: &str = "#64748b";

/// Palette offered when creating a subject
pub const SUBJECT_COLORS: [&str; 18] = [
    "#64748b", "#ef4444", "#f97316", "#f59e0b", "#eab308", "#84cc16", "#22c55e", "#10b981",
    "#14b8a6", "#06b6d4", "#0ea5e9", "#3b82f6", "#6366f1", "#8b5cf6", "#a855f7", "#d946ef",
    "#ec4899", "#f43f5e",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub is_archived: bool,
}

impl Subject {
    /// A new, unarchived subject with a fresh id
    pub fn new(name: &str, color: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudyError::InvalidInput("subject name is empty".into()));
        }
        if !is_hex_color(color) {
            return Err(StudyError::InvalidInput(format!(
                "color must look like #rrggbb, got {color:?}"
            )));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.to_lowercase(),
            is_archived: false,
        })
    }

    fn builtin(id: &str, name: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            is_archived: false,
        }
    }

    /// Foreground color as RGB, if the stored color parses
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.color)
    }
}

pub fn default_subjects() -> Vec<Subject> {
    vec![
        Subject::builtin("math", "Mathematics", "#3b82f6"),
        Subject::builtin("cs", "Computer Science", "#10b981"),
        Subject::builtin("lit", "Literature", "#f59e0b"),
        Subject::builtin("phys", "Physics", "#a855f7"),
        Subject::builtin("chem", "Chemistry", "#f43f5e"),
        Subject::builtin("misc", "General", FALLBACK_COLOR),
    ]
}

/// Subject for display: the matching one, else the first known subject.
/// Dangling ids are tolerated everywhere else.
pub fn resolve_subject<'a>(subjects: &'a [Subject], id: &str) -> Option<&'a Subject> {
    subjects.iter().find(|s| s.id == id).or_else(|| subjects.first())
}

/// Active subjects first, original order otherwise preserved
pub fn sort_for_listing(subjects: &mut [Subject]) {
    subjects.sort_by_key(|s| s.is_archived);
}

pub fn is_hex_color(color: &str) -> bool {
    parse_hex_color(color).is_some()
}

pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub id: String,
    pub text: String,
    pub is_completed: bool,
    pub date_string: String,
    pub created_at: i64,
}

impl DailyGoal {
    pub fn new(text: &str, date_string: &str, created_at: i64) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyError::InvalidInput("goal text is empty".into()));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_completed: false,
            date_string: normalize_date(date_string)?,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub topics: String,
}

impl Exam {
    pub fn new(subject_id: &str, title: &str, date: &str, topics: &str) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::InvalidInput("exam title is empty".into()));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            title: title.to_string(),
            date: normalize_date(date)?,
            topics: topics.trim().to_string(),
        })
    }

    /// Whole days from `today` until the exam; negative once it has passed
    pub fn days_until(&self, today: NaiveDate) -> Option<i64> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        Some((date - today).num_days())
    }
}

/// Gap left between neighbouring tasks of a column
pub const TASK_ORDER_STEP: i64 = 1000;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Board columns, left to right
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }
}

/// A card on the task board. `order` sorts cards within their column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub subject_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub order: i64,
}

impl Task {
    /// A new card appended to the end of the `status` column of `board`
    pub fn new(
        title: &str,
        subject_id: &str,
        status: TaskStatus,
        board: &[Task],
        now_ms: i64,
    ) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::InvalidInput("task title is empty".into()));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            status,
            subject_id: subject_id.to_string(),
            created_at: now_ms,
            updated_at: now_ms,
            order: next_task_order(board, status),
        })
    }

    /// Move the card to the end of another column. Moving within the same
    /// column keeps its place.
    pub fn move_to(&mut self, status: TaskStatus, board: &[Task], now_ms: i64) {
        if self.status == status {
            return;
        }
        self.order = next_task_order(board, status);
        self.status = status;
        self.updated_at = now_ms;
    }
}

/// Order value that places a card after everything in the column
pub fn next_task_order(board: &[Task], status: TaskStatus) -> i64 {
    board
        .iter()
        .filter(|t| t.status == status)
        .map(|t| t.order)
        .max()
        .unwrap_or(0)
        + TASK_ORDER_STEP
}

/// Cards of one column in board order
pub fn column(board: &[Task], status: TaskStatus) -> Vec<&Task> {
    let mut cards: Vec<&Task> = board.iter().filter(|t| t.status == status).collect();
    cards.sort_by_key(|t| (t.order, t.created_at));
    cards
}

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| StudyError::InvalidInput(format!("expected YYYY-MM-DD, got {date:?}")))
}

/// Canonical zero-padded `YYYY-MM-DD`, so `2026-3-9` keys the same day as `2026-03-09`
pub fn normalize_date(date: &str) -> Result<String> {
    parse_date(date).map(|d| d.format("%Y-%m-%d").to_string())
}

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Immutable record of one completed timing activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub subject_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_ms: u64,
    /// `YYYY-MM-DD` grouping key
    pub date_string: String,
}

impl StudySession {
    /// Session ending at `end_ms` that lasted `duration_ms`. The start is
    /// derived from the duration, so paused spans are not part of it.
    pub fn completed(subject_id: impl Into<String>, end_ms: i64, duration_ms: u64) -> Self {
        let duration = i64::try_from(duration_ms).unwrap_or(i64::MAX);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.into(),
            start_time: end_ms.saturating_sub(duration),
            end_time: end_ms,
            duration_ms,
            date_string: date_key(end_ms),
        }
    }
}

/// Local calendar day of an epoch-millisecond timestamp, as `YYYY-MM-DD`
pub fn date_key(epoch_ms: i64) -> String {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string())
}

pub fn today_key() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Destination for completed sessions.
///
/// `create` may hand the session off without waiting for it to be durable;
/// callers log failures and carry on.
pub trait SessionSink {
    fn create(&self, session: &StudySession) -> Result<()>;
}

impl<T: SessionSink + ?Sized> SessionSink for &T {
    fn create(&self, session: &StudySession) -> Result<()> {
        (**self).create(session)
    }
}

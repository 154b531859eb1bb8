//! The single persisted record describing the one timer that may be running.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::kv::KeyValueStore;

/// Key of the single storage slot
pub const STORAGE_KEY: &str = "studySync_activeTimer";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

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
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TimerMode {
    #[default]
    Stopwatch,
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 4] = [
        TimerMode::Stopwatch,
        TimerMode::Pomodoro,
        TimerMode::ShortBreak,
        TimerMode::LongBreak,
    ];

    /// Next mode in display order, wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Stopwatch => "Stopwatch",
            TimerMode::Pomodoro => "Pomodoro",
            TimerMode::ShortBreak => "Short break",
            TimerMode::LongBreak => "Long break",
        }
    }
}

/// Timing fields of the active timer. A segment start exists only while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Paused {
        accumulated_ms: u64,
    },
    Running {
        accumulated_ms: u64,
        /// Epoch milliseconds at which the current segment began
        segment_start_ms: i64,
    },
}

impl TimerPhase {
    pub fn status(&self) -> TimerStatus {
        match self {
            TimerPhase::Idle => TimerStatus::Idle,
            TimerPhase::Paused { .. } => TimerStatus::Paused,
            TimerPhase::Running { .. } => TimerStatus::Running,
        }
    }

    /// Time accrued by finished segments
    pub fn accumulated_ms(&self) -> u64 {
        match *self {
            TimerPhase::Idle => 0,
            TimerPhase::Paused { accumulated_ms } | TimerPhase::Running { accumulated_ms, .. } => {
                accumulated_ms
            }
        }
    }

    pub fn segment_start_ms(&self) -> Option<i64> {
        match *self {
            TimerPhase::Running {
                segment_start_ms, ..
            } => Some(segment_start_ms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireTimerState", into = "WireTimerState")]
pub struct ActiveTimerState {
    pub mode: TimerMode,
    pub subject_id: String,
    pub phase: TimerPhase,
}

impl ActiveTimerState {
    pub fn running(
        mode: TimerMode,
        subject_id: impl Into<String>,
        accumulated_ms: u64,
        segment_start_ms: i64,
    ) -> Self {
        Self {
            mode,
            subject_id: subject_id.into(),
            phase: TimerPhase::Running {
                accumulated_ms,
                segment_start_ms,
            },
        }
    }

    pub fn paused(mode: TimerMode, subject_id: impl Into<String>, accumulated_ms: u64) -> Self {
        Self {
            mode,
            subject_id: subject_id.into(),
            phase: TimerPhase::Paused { accumulated_ms },
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.phase.status()
    }
}

/// Flat camelCase layout of the stored slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimerState {
    status: TimerStatus,
    #[serde(default)]
    mode: TimerMode,
    subject_id: String,
    #[serde(default)]
    start_time: Option<i64>,
    #[serde(default)]
    accumulated_time: u64,
}

impl From<WireTimerState> for ActiveTimerState {
    fn from(w: WireTimerState) -> Self {
        let phase = match (w.status, w.start_time) {
            (TimerStatus::Idle, _) => TimerPhase::Idle,
            (TimerStatus::Running, Some(segment_start_ms)) => TimerPhase::Running {
                accumulated_ms: w.accumulated_time,
                segment_start_ms,
            },
            // running without a segment start carries no running segment
            (TimerStatus::Running, None) | (TimerStatus::Paused, _) => TimerPhase::Paused {
                accumulated_ms: w.accumulated_time,
            },
        };
        Self {
            mode: w.mode,
            subject_id: w.subject_id,
            phase,
        }
    }
}

impl From<ActiveTimerState> for WireTimerState {
    fn from(s: ActiveTimerState) -> Self {
        Self {
            status: s.phase.status(),
            mode: s.mode,
            start_time: s.phase.segment_start_ms(),
            accumulated_time: s.phase.accumulated_ms(),
            subject_id: s.subject_id,
        }
    }
}

/// Single-slot persistence of [`ActiveTimerState`].
///
/// `save`, `load` and `clear` never fail towards the caller: storage and parse
/// errors are logged and treated as "no state".
#[derive(Debug)]
pub struct TimerStateStore<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> TimerStateStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn save(&self, state: &ActiveTimerState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize timer state");
                return;
            }
        };
        if let Err(e) = self.kv.set(STORAGE_KEY, &json) {
            warn!(error = %e, "Failed to save timer state");
        }
    }

    pub fn load(&self) -> Option<ActiveTimerState> {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load timer state");
            None
        })
    }

    /// Like [`load`](Self::load), but an unreadable store is an error rather
    /// than "no state". Malformed content still reads as absent.
    pub fn try_load(&self) -> Result<Option<ActiveTimerState>> {
        let raw = match self.kv.get(STORAGE_KEY)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                debug!(error = %e, "Discarding malformed timer state");
                Ok(None)
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.kv.remove(STORAGE_KEY) {
            warn!(error = %e, "Failed to clear timer state");
        }
    }
}

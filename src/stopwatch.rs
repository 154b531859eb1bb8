//! The stopwatch state machine the UI drives.
//!
//! Elapsed time is never counted in memory. Every observation re-reads the
//! persisted [`ActiveTimerState`] and derives the value from wall-clock
//! timestamps, so a restarted process picks up exactly where the previous one
//! left off. Separate processes share the same slot without any locking; the
//! last writer wins.

use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::elapsed::elapsed;
use crate::kv::KeyValueStore;
use crate::session::{SessionSink, StudySession};
use crate::timer_state::{ActiveTimerState, TimerMode, TimerPhase, TimerStatus, TimerStateStore};

/// Shorter activities are discarded on stop instead of becoming a session
pub const MIN_SESSION_MS: u64 = 1000;

/// Display-refresh loop handle. Armed exactly while the timer is running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameLoop {
    armed: bool,
    frames: u64,
}

impl FrameLoop {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Frames observed since the loop was last armed
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn arm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.frames = 0;
        }
    }

    fn cancel(&mut self) {
        self.armed = false;
    }
}

pub struct StopwatchController<K: KeyValueStore, C: Clock, S: SessionSink> {
    store: TimerStateStore<K>,
    clock: C,
    sessions: S,
    status: TimerStatus,
    mode: TimerMode,
    subject_id: String,
    elapsed_ms: u64,
    /// Last state this controller wrote; stands in when storage is unreadable
    shadow: Option<ActiveTimerState>,
    frame_loop: FrameLoop,
}

impl<K: KeyValueStore, C: Clock, S: SessionSink> StopwatchController<K, C, S> {
    pub fn new(store: TimerStateStore<K>, clock: C, sessions: S, subject_id: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            sessions,
            status: TimerStatus::Idle,
            mode: TimerMode::Stopwatch,
            subject_id: subject_id.into(),
            elapsed_ms: 0,
            shadow: None,
            frame_loop: FrameLoop::default(),
        }
    }

    /// Adopt whatever timer is persisted, e.g. one left running by a previous process
    pub fn restore(&mut self) {
        let Some(state) = self.store.load() else {
            return;
        };
        let now = self.clock.now_ms();
        self.status = state.status();
        self.mode = state.mode;
        self.subject_id = state.subject_id.clone();
        self.elapsed_ms = elapsed(Some(&state), now);
        if self.status == TimerStatus::Running {
            self.frame_loop.arm();
        } else {
            self.frame_loop.cancel();
        }
        info!(status = %self.status, elapsed_ms = self.elapsed_ms, "Restored active timer");
        self.shadow = Some(state);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn current_subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn frame_loop(&self) -> FrameLoop {
        self.frame_loop
    }

    pub fn is_ticking(&self) -> bool {
        self.frame_loop.is_armed()
    }

    /// Begin a new segment. Calling this while already running changes nothing,
    /// in particular the current segment keeps its original start.
    pub fn start(&mut self) {
        if self.status == TimerStatus::Running {
            debug!("start ignored, timer already running");
            return;
        }
        let now = self.clock.now_ms();
        let state = ActiveTimerState::running(self.mode, self.subject_id.clone(), self.elapsed_ms, now);
        self.persist(state);
        self.status = TimerStatus::Running;
        self.frame_loop.arm();
    }

    /// Fold the running segment into the accumulated time
    pub fn pause(&mut self) {
        if self.status != TimerStatus::Running {
            return;
        }
        let total = elapsed(self.loaded_state().as_ref(), self.clock.now_ms());
        let state = ActiveTimerState::paused(self.mode, self.subject_id.clone(), total);
        self.persist(state);
        self.elapsed_ms = total;
        self.status = TimerStatus::Paused;
        self.frame_loop.cancel();
    }

    /// End the activity and return to idle. Returns the session handed to the
    /// session store, if the activity was long enough to record one. A failed
    /// hand-off is logged; the timer stops regardless.
    pub fn stop(&mut self) -> Option<StudySession> {
        if self.status == TimerStatus::Idle {
            self.reset();
            return None;
        }
        let now = self.clock.now_ms();
        let final_ms = elapsed(self.loaded_state().as_ref(), now);

        let recorded = if final_ms >= MIN_SESSION_MS {
            let session = StudySession::completed(self.subject_id.clone(), now, final_ms);
            if let Err(e) = self.sessions.create(&session) {
                error!(id = %session.id, error = %e, "Failed to record session");
            } else {
                info!(subject = %session.subject_id, duration_ms = final_ms, "Session recorded");
            }
            Some(session)
        } else {
            debug!(elapsed_ms = final_ms, "Activity too short to record");
            None
        };

        self.reset();
        recorded
    }

    /// Discard the activity without recording anything
    pub fn reset(&mut self) {
        self.store.clear();
        self.shadow = None;
        self.status = TimerStatus::Idle;
        self.elapsed_ms = 0;
        self.frame_loop.cancel();
    }

    /// Re-attribute the activity. While timing, the persisted subject is
    /// patched in place and the timing fields are left alone.
    pub fn set_subject_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.status != TimerStatus::Idle {
            if let Some(mut state) = self.loaded_state() {
                state.subject_id = id.clone();
                self.persist(state);
            }
        }
        self.subject_id = id;
    }

    /// Modes only change while idle; other requests are ignored.
    pub fn set_mode(&mut self, mode: TimerMode) {
        if self.status != TimerStatus::Idle {
            debug!(requested = %mode, "mode change ignored while timing");
            return;
        }
        self.mode = mode;
    }

    /// One display frame. Re-derives the elapsed time from the persisted state
    /// and reports whether the loop should keep going. Once the persisted timer
    /// is no longer running (paused or stopped elsewhere) the loop cancels itself.
    pub fn tick(&mut self) -> bool {
        if !self.frame_loop.is_armed() {
            return false;
        }
        match self.loaded_state() {
            Some(state) if state.status() == TimerStatus::Running => {
                self.elapsed_ms = elapsed(Some(&state), self.clock.now_ms());
                self.frame_loop.frames += 1;
                true
            }
            _ => {
                debug!("persisted timer is no longer running, cancelling frame loop");
                self.frame_loop.cancel();
                false
            }
        }
    }

    /// Persisted state, or this controller's own last write when storage
    /// cannot be read at all
    fn loaded_state(&self) -> Option<ActiveTimerState> {
        match self.store.try_load() {
            Ok(state) => state,
            Err(e) => {
                debug!(error = %e, "storage unreadable, using in-memory state");
                self.shadow.clone()
            }
        }
    }

    fn persist(&mut self, state: ActiveTimerState) {
        debug_assert!(state.phase != TimerPhase::Idle);
        self.store.save(&state);
        self.shadow = Some(state);
    }

    pub fn store(&self) -> &TimerStateStore<K> {
        &self.store
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }
}

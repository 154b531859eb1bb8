use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::Clock;
use crate::config::Config;
use crate::kv::KeyValueStore;
use crate::models::{resolve_subject, Subject};
use crate::session::{today_key, SessionSink, StudySession};
use crate::stopwatch::StopwatchController;
use crate::timer_state::TimerStatus;
use crate::util::{clock_reading, format_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Continue,
    Quit,
}

/// Everything the timer screen shows, plus the key bindings that drive it
pub struct App<K: KeyValueStore, C: Clock, S: SessionSink> {
    pub stopwatch: StopwatchController<K, C, S>,
    pub config: Config,
    pub subjects: Vec<Subject>,
    today: String,
    /// Recorded time per subject for `today`
    today_totals: HashMap<String, u64>,
    pub notice: Option<String>,
    /// Set once the running countdown has been announced
    countdown_announced: bool,
    bell: bool,
}

impl<K: KeyValueStore, C: Clock, S: SessionSink> App<K, C, S> {
    pub fn new(
        stopwatch: StopwatchController<K, C, S>,
        config: Config,
        subjects: Vec<Subject>,
        today_sessions: &[StudySession],
    ) -> Self {
        let today = today_key();
        let today_totals = today_sessions
            .iter()
            .filter(|s| s.date_string == today)
            .fold(HashMap::new(), |mut totals, s| {
                *totals.entry(s.subject_id.clone()).or_insert(0) += s.duration_ms;
                totals
            });
        Self {
            stopwatch,
            config,
            subjects,
            today,
            today_totals,
            notice: None,
            countdown_announced: false,
            bell: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppAction::Quit;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Char(' ') => self.toggle(),
            KeyCode::Char('s') => self.stop(),
            KeyCode::Char('r') => {
                self.stopwatch.reset();
                self.notice = Some("Timer reset".to_string());
            }
            KeyCode::Char('m') => {
                if self.stopwatch.status() == TimerStatus::Idle {
                    self.stopwatch.set_mode(self.stopwatch.mode().next());
                    self.notice = None;
                } else {
                    self.notice = Some("Stop the timer to change mode".to_string());
                }
            }
            KeyCode::Tab => self.cycle_subject(),
            _ => {}
        }
        AppAction::Continue
    }

    pub fn on_tick(&mut self) {
        self.stopwatch.tick();

        let (_, done) = self.clock_reading();
        if !done {
            self.countdown_announced = false;
        } else if !self.countdown_announced {
            self.countdown_announced = true;
            self.bell = true;
            self.notice = Some(format!("{} finished", self.stopwatch.mode().label()));
        }
    }

    /// Whether the terminal bell should ring, cleared by the call
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    pub fn is_ticking(&self) -> bool {
        self.stopwatch.is_ticking()
    }

    pub fn current_subject(&self) -> Option<&Subject> {
        resolve_subject(&self.subjects, self.stopwatch.current_subject_id())
    }

    /// Value shown on the clock and whether a countdown has finished
    pub fn clock_reading(&self) -> (u64, bool) {
        clock_reading(
            self.stopwatch.elapsed_ms(),
            self.config.target_ms(self.stopwatch.mode()),
        )
    }

    /// Time already recorded today for the current subject
    pub fn subject_today_ms(&self) -> u64 {
        self.today_totals
            .get(self.stopwatch.current_subject_id())
            .copied()
            .unwrap_or(0)
    }

    fn toggle(&mut self) {
        match self.stopwatch.status() {
            TimerStatus::Running => self.stopwatch.pause(),
            TimerStatus::Idle | TimerStatus::Paused => self.stopwatch.start(),
        }
        self.notice = None;
    }

    fn stop(&mut self) {
        if self.stopwatch.status() == TimerStatus::Idle {
            return;
        }
        match self.stopwatch.stop() {
            Some(session) => {
                if session.date_string == self.today {
                    *self
                        .today_totals
                        .entry(session.subject_id.clone())
                        .or_insert(0) += session.duration_ms;
                }
                self.notice = Some(format!(
                    "Saved {} of {}",
                    format_duration(session.duration_ms),
                    self.current_subject().map_or("Unknown", |s| s.name.as_str())
                ));
            }
            None => self.notice = Some("Too short to save".to_string()),
        }
    }

    fn cycle_subject(&mut self) {
        let active: Vec<&Subject> = self.subjects.iter().filter(|s| !s.is_archived).collect();
        if active.is_empty() {
            return;
        }
        let current = self.stopwatch.current_subject_id();
        let next = active
            .iter()
            .position(|s| s.id == current)
            .map_or(0, |idx| (idx + 1) % active.len());
        let id = active[next].id.clone();
        self.stopwatch.set_subject_id(id);
    }
}

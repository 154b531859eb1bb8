//! One-shot subcommands. Each builds a controller over the persisted timer,
//! restores it, applies a single event and exits.

use std::io::Write;

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::analytics::{self, Intensity};
use crate::clock::Clock;
use crate::config::{Config, ConfigStore};
use crate::db::{ClearScope, StudyDb};
use crate::error::{Result, StudyError};
use crate::kv::KeyValueStore;
use crate::models::{
    column, normalize_date, parse_date, resolve_subject, sort_for_listing, DailyGoal, Exam, Subject, Task,
    TaskStatus, SUBJECT_COLORS,
};
use crate::session::date_key;
use crate::stopwatch::{StopwatchController, MIN_SESSION_MS};
use crate::timer_state::{TimerMode, TimerStateStore, TimerStatus};
use crate::util::{clock_reading, format_clock, format_duration, format_short};

/// study timer that survives restarts, with session history and stats
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A study timer whose running state is persisted, so it keeps counting across restarts. Without a subcommand the interactive timer opens."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// show the active timer
    Status,
    /// start or resume the timer
    Start {
        /// subject to attribute the time to
        #[clap(long)]
        subject: Option<String>,
        /// timer mode, only when starting from idle
        #[clap(long, value_enum)]
        mode: Option<TimerMode>,
    },
    /// pause the running timer
    Pause,
    /// stop the timer and record the session
    Stop,
    /// discard the active timer without recording
    Reset,
    /// choose the mode the next timer starts in
    Mode {
        #[clap(value_enum)]
        mode: TimerMode,
    },
    /// choose the subject, re-attributing an active timer
    Subject { id: String },
    /// list recorded sessions, today's by default
    History {
        #[clap(long, conflicts_with = "all")]
        date: Option<String>,
        #[clap(long)]
        all: bool,
    },
    /// delete recorded sessions and goals
    Clear {
        #[clap(long, conflicts_with = "all", required_unless_present = "all")]
        today: bool,
        #[clap(long)]
        all: bool,
    },
    /// manage subjects
    Subjects {
        #[clap(subcommand)]
        action: SubjectsAction,
    },
    /// manage daily goals
    Goals {
        /// day the goals belong to, today by default
        #[clap(long, global = true)]
        date: Option<String>,
        #[clap(subcommand)]
        action: GoalsAction,
    },
    /// manage upcoming exams
    Exams {
        #[clap(subcommand)]
        action: ExamsAction,
    },
    /// manage the task board
    Tasks {
        #[clap(subcommand)]
        action: TasksAction,
    },
    /// totals, subject split and a month heatmap
    Stats {
        /// month to chart as YYYY-MM, the current one by default
        #[clap(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SubjectsAction {
    List,
    Add {
        name: String,
        /// #rrggbb, picked from the palette when omitted
        #[clap(long)]
        color: Option<String>,
    },
    /// toggle whether a subject is archived
    Archive { id: String },
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum GoalsAction {
    List,
    Add { text: String },
    /// mark a goal completed
    Done { id: String },
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ExamsAction {
    List,
    Add {
        #[clap(long)]
        subject: String,
        title: String,
        /// YYYY-MM-DD
        date: String,
        #[clap(long, default_value = "")]
        topics: String,
    },
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TasksAction {
    /// show the board column by column
    List,
    Add {
        title: String,
        /// subject the task belongs to, the current one by default
        #[clap(long)]
        subject: Option<String>,
        #[clap(long, value_enum, default_value_t = TaskStatus::Todo)]
        status: TaskStatus,
    },
    /// move a task to the end of another column
    Move {
        id: String,
        #[clap(value_enum)]
        status: TaskStatus,
    },
    Remove { id: String },
}

/// Storage, clock and config the commands run against
pub struct CommandEnv<K: KeyValueStore, C: Clock, CS: ConfigStore> {
    pub kv: K,
    pub clock: C,
    pub db: StudyDb,
    pub config: CS,
}

impl<K: KeyValueStore, C: Clock, CS: ConfigStore> CommandEnv<K, C, CS> {
    pub fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        debug!(?command, "Running command");
        match command {
            Command::Status => self.status(out),
            Command::Start { subject, mode } => self.start(subject, mode, out),
            Command::Pause => self.pause(out),
            Command::Stop => self.stop(out),
            Command::Reset => {
                self.controller(&self.config.load()).reset();
                writeln!(out, "Timer reset")?;
                Ok(())
            }
            Command::Mode { mode } => self.set_mode(mode, out),
            Command::Subject { id } => self.set_subject(id, out),
            Command::History { date, all } => self.history(date, all, out),
            Command::Clear { all, .. } => {
                let scope = if all {
                    ClearScope::All
                } else {
                    ClearScope::Day(self.today())
                };
                self.db.clear_history(&scope)?;
                match scope {
                    ClearScope::All => writeln!(out, "Cleared all history")?,
                    ClearScope::Day(day) => writeln!(out, "Cleared history for {day}")?,
                }
                Ok(())
            }
            Command::Subjects { action } => self.subjects(action, out),
            Command::Goals { date, action } => self.goals(date, action, out),
            Command::Exams { action } => self.exams(action, out),
            Command::Tasks { action } => self.tasks(action, out),
            Command::Stats { month } => self.stats(month, out),
        }
    }

    fn today(&self) -> String {
        date_key(self.clock.now_ms())
    }

    fn controller(&self, config: &Config) -> StopwatchController<&K, &C, &StudyDb> {
        let mut controller = StopwatchController::new(
            TimerStateStore::new(&self.kv),
            &self.clock,
            &self.db,
            config.default_subject.clone(),
        );
        controller.set_mode(config.default_mode);
        controller.restore();
        controller
    }

    fn known_subject(&self, id: &str) -> Result<Subject> {
        self.db
            .subjects()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StudyError::NotFound(format!("subject {id:?}")))
    }

    fn subject_name(&self, id: &str) -> Result<String> {
        let subjects = self.db.subjects()?;
        Ok(subjects
            .iter()
            .find(|s| s.id == id)
            .map_or_else(|| "Unknown".to_string(), |s| s.name.clone()))
    }

    fn status<W: Write>(&self, out: &mut W) -> Result<()> {
        let config = self.config.load();
        let controller = self.controller(&config);
        let subject_id = controller.current_subject_id().to_string();
        let subjects = self.db.subjects()?;
        let name = resolve_subject(&subjects, &subject_id).map_or("Unknown", |s| s.name.as_str());

        writeln!(out, "status:  {}", controller.status())?;
        writeln!(out, "mode:    {}", controller.mode().label())?;
        writeln!(out, "subject: {} ({})", name, subject_id)?;
        writeln!(out, "elapsed: {}", format_clock(controller.elapsed_ms()))?;
        if let Some(target) = config.target_ms(controller.mode()) {
            match clock_reading(controller.elapsed_ms(), Some(target)) {
                (_, true) => writeln!(out, "left:    DONE")?,
                (left, false) => writeln!(out, "left:    {}", format_clock(left))?,
            }
        }
        let today = self.db.sessions_by_date(&self.today())?;
        let recorded = analytics::subject_total_on(&today, &subject_id, &self.today());
        writeln!(out, "today:   {}", format_short(recorded))?;
        Ok(())
    }

    fn start<W: Write>(&self, subject: Option<String>, mode: Option<TimerMode>, out: &mut W) -> Result<()> {
        let config = self.config.load();
        let mut controller = self.controller(&config);
        let status = controller.status();

        if let Some(mode) = mode {
            if status != TimerStatus::Idle {
                return Err(StudyError::InvalidInput(
                    "the mode can only change while the timer is idle".into(),
                ));
            }
            controller.set_mode(mode);
        }
        if let Some(id) = subject {
            self.known_subject(&id)?;
            controller.set_subject_id(id);
        }

        let name = self.subject_name(controller.current_subject_id())?;
        match status {
            TimerStatus::Running => writeln!(
                out,
                "Already running: {} on {}",
                format_clock(controller.elapsed_ms()),
                name
            )?,
            TimerStatus::Paused => {
                controller.start();
                writeln!(out, "Resumed {} at {}", name, format_clock(controller.elapsed_ms()))?;
            }
            TimerStatus::Idle => {
                controller.start();
                writeln!(out, "Started {} for {}", controller.mode().label(), name)?;
            }
        }
        Ok(())
    }

    fn pause<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut controller = self.controller(&self.config.load());
        if controller.status() != TimerStatus::Running {
            writeln!(out, "Timer is not running")?;
            return Ok(());
        }
        controller.pause();
        writeln!(out, "Paused at {}", format_clock(controller.elapsed_ms()))?;
        Ok(())
    }

    fn stop<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut controller = self.controller(&self.config.load());
        if controller.status() == TimerStatus::Idle {
            writeln!(out, "No active timer")?;
            return Ok(());
        }
        match controller.stop() {
            Some(session) => writeln!(
                out,
                "Recorded {} of {}",
                format_duration(session.duration_ms),
                self.subject_name(&session.subject_id)?
            )?,
            None => writeln!(
                out,
                "Discarded, sessions shorter than {} are not recorded",
                format_duration(MIN_SESSION_MS)
            )?,
        }
        Ok(())
    }

    fn set_mode<W: Write>(&self, mode: TimerMode, out: &mut W) -> Result<()> {
        let mut config = self.config.load();
        if self.controller(&config).status() != TimerStatus::Idle {
            return Err(StudyError::InvalidInput(
                "the mode can only change while the timer is idle".into(),
            ));
        }
        config.default_mode = mode;
        self.config.save(&config)?;
        writeln!(out, "Mode set to {}", mode.label())?;
        Ok(())
    }

    fn set_subject<W: Write>(&self, id: String, out: &mut W) -> Result<()> {
        let subject = self.known_subject(&id)?;
        let mut config = self.config.load();
        self.controller(&config).set_subject_id(id.clone());
        config.default_subject = id;
        self.config.save(&config)?;
        writeln!(out, "Subject set to {}", subject.name)?;
        Ok(())
    }

    fn history<W: Write>(&self, date: Option<String>, all: bool, out: &mut W) -> Result<()> {
        let (sessions, day) = if all {
            (self.db.all_sessions()?, None)
        } else {
            let day = match date {
                Some(day) => normalize_date(&day)?,
                None => self.today(),
            };
            (self.db.sessions_by_date(&day)?, Some(day))
        };
        if sessions.is_empty() {
            writeln!(out, "No sessions")?;
            return Ok(());
        }

        let subjects = self.db.subjects()?;
        let ordered = match &day {
            Some(day) => analytics::history_for_day(&sessions, day),
            None => {
                let mut all: Vec<_> = sessions.iter().collect();
                all.sort_by(|a, b| b.start_time.cmp(&a.start_time));
                all
            }
        };
        for session in ordered {
            let started = Local
                .timestamp_millis_opt(session.start_time)
                .single()
                .map_or_else(|| "--:--".to_string(), |dt| dt.format("%H:%M").to_string());
            let name = subjects
                .iter()
                .find(|s| s.id == session.subject_id)
                .map_or("Unknown", |s| s.name.as_str());
            writeln!(
                out,
                "{}  {}  {:>8}  {}",
                session.date_string,
                started,
                format_duration(session.duration_ms),
                name
            )?;
        }
        writeln!(out, "total: {}", format_short(analytics::lifetime_total(&sessions)))?;
        Ok(())
    }

    fn subjects<W: Write>(&self, action: SubjectsAction, out: &mut W) -> Result<()> {
        match action {
            SubjectsAction::List => {
                let mut subjects = self.db.subjects()?;
                sort_for_listing(&mut subjects);
                for s in subjects {
                    let archived = if s.is_archived { "  (archived)" } else { "" };
                    writeln!(out, "{:<38} {} {}{}", s.id, s.color, s.name, archived)?;
                }
            }
            SubjectsAction::Add { name, color } => {
                let existing = self.db.subjects()?.len();
                let color = color.unwrap_or_else(|| SUBJECT_COLORS[existing % SUBJECT_COLORS.len()].to_string());
                let subject = Subject::new(&name, &color)?;
                self.db.save_subject(&subject)?;
                writeln!(out, "Added {} ({})", subject.name, subject.id)?;
            }
            SubjectsAction::Archive { id } => {
                let mut subject = self.known_subject(&id)?;
                subject.is_archived = !subject.is_archived;
                self.db.save_subject(&subject)?;
                let verb = if subject.is_archived { "Archived" } else { "Restored" };
                writeln!(out, "{} {}", verb, subject.name)?;
            }
            SubjectsAction::Remove { id } => {
                if self.db.delete_subject(&id)? == 0 {
                    return Err(StudyError::NotFound(format!("subject {id:?}")));
                }
                writeln!(out, "Removed subject {id}")?;
            }
        }
        Ok(())
    }

    fn goals<W: Write>(&self, date: Option<String>, action: GoalsAction, out: &mut W) -> Result<()> {
        let day = match date {
            Some(day) => normalize_date(&day)?,
            None => self.today(),
        };
        match action {
            GoalsAction::List => {
                let goals = self.db.goals_by_date(&day)?;
                if goals.is_empty() {
                    writeln!(out, "No goals for {day}")?;
                }
                for goal in goals {
                    let mark = if goal.is_completed { 'x' } else { ' ' };
                    writeln!(out, "[{}] {}  ({})", mark, goal.text, goal.id)?;
                }
            }
            GoalsAction::Add { text } => {
                let goal = DailyGoal::new(&text, &day, self.clock.now_ms())?;
                self.db.save_goal(&goal)?;
                writeln!(out, "Added goal {}", goal.id)?;
            }
            GoalsAction::Done { id } => {
                if self.db.set_goal_completed(&id, true)? == 0 {
                    return Err(StudyError::NotFound(format!("goal {id:?}")));
                }
                writeln!(out, "Completed goal {id}")?;
            }
            GoalsAction::Remove { id } => {
                if self.db.delete_goal(&id)? == 0 {
                    return Err(StudyError::NotFound(format!("goal {id:?}")));
                }
                writeln!(out, "Removed goal {id}")?;
            }
        }
        Ok(())
    }

    fn exams<W: Write>(&self, action: ExamsAction, out: &mut W) -> Result<()> {
        match action {
            ExamsAction::List => {
                let exams = self.db.exams()?;
                if exams.is_empty() {
                    writeln!(out, "No exams")?;
                }
                let today = parse_date(&self.today())?;
                let subjects = self.db.subjects()?;
                for exam in exams {
                    let countdown = match exam.days_until(today) {
                        Some(0) => "today".to_string(),
                        Some(1) => "tomorrow".to_string(),
                        Some(d) if d > 1 => format!("in {d} days"),
                        Some(d) => format!("{} days ago", -d),
                        None => "?".to_string(),
                    };
                    let name = subjects
                        .iter()
                        .find(|s| s.id == exam.subject_id)
                        .map_or("Unknown", |s| s.name.as_str());
                    writeln!(
                        out,
                        "{}  {:<12} {} [{}]  ({})",
                        exam.date, countdown, exam.title, name, exam.id
                    )?;
                    if !exam.topics.is_empty() {
                        writeln!(out, "            {}", exam.topics)?;
                    }
                }
            }
            ExamsAction::Add {
                subject,
                title,
                date,
                topics,
            } => {
                self.known_subject(&subject)?;
                let exam = Exam::new(&subject, &title, &date, &topics)?;
                self.db.save_exam(&exam)?;
                writeln!(out, "Added exam {}", exam.id)?;
            }
            ExamsAction::Remove { id } => {
                if self.db.delete_exam(&id)? == 0 {
                    return Err(StudyError::NotFound(format!("exam {id:?}")));
                }
                writeln!(out, "Removed exam {id}")?;
            }
        }
        Ok(())
    }

    fn tasks<W: Write>(&self, action: TasksAction, out: &mut W) -> Result<()> {
        match action {
            TasksAction::List => {
                let board = self.db.tasks()?;
                if board.is_empty() {
                    writeln!(out, "No tasks")?;
                    return Ok(());
                }
                let subjects = self.db.subjects()?;
                for status in TaskStatus::ALL {
                    let cards = column(&board, status);
                    writeln!(out, "{} ({})", status.label(), cards.len())?;
                    for task in cards {
                        let name = subjects
                            .iter()
                            .find(|s| s.id == task.subject_id)
                            .map_or("Unknown", |s| s.name.as_str());
                        writeln!(out, "  {} [{}]  ({})", task.title, name, task.id)?;
                    }
                }
            }
            TasksAction::Add {
                title,
                subject,
                status,
            } => {
                let subject_id = match subject {
                    Some(id) => self.known_subject(&id)?.id,
                    None => self.config.load().default_subject,
                };
                let board = self.db.tasks()?;
                let task = Task::new(&title, &subject_id, status, &board, self.clock.now_ms())?;
                self.db.save_task(&task)?;
                writeln!(out, "Added task {}", task.id)?;
            }
            TasksAction::Move { id, status } => {
                let board = self.db.tasks()?;
                let mut task = board
                    .iter()
                    .find(|t| t.id == id)
                    .cloned()
                    .ok_or_else(|| StudyError::NotFound(format!("task {id:?}")))?;
                task.move_to(status, &board, self.clock.now_ms());
                self.db.save_task(&task)?;
                writeln!(out, "Moved {} to {}", task.title, status.label())?;
            }
            TasksAction::Remove { id } => {
                if self.db.delete_task(&id)? == 0 {
                    return Err(StudyError::NotFound(format!("task {id:?}")));
                }
                writeln!(out, "Removed task {id}")?;
            }
        }
        Ok(())
    }

    fn stats<W: Write>(&self, month: Option<String>, out: &mut W) -> Result<()> {
        let (year, month) = match month {
            Some(m) => parse_month(&m)?,
            None => {
                let today = parse_date(&self.today())?;
                (today.year(), today.month())
            }
        };
        let sessions = self.db.all_sessions()?;
        let subjects = self.db.subjects()?;

        writeln!(out, "total:    {}", format_short(analytics::lifetime_total(&sessions)))?;
        writeln!(out, "sessions: {}", sessions.len())?;
        writeln!(out, "average:  {}", format_duration(analytics::average_session(&sessions)))?;

        let segments = analytics::subject_distribution(&sessions, &subjects);
        if !segments.is_empty() {
            writeln!(out)?;
        }
        for seg in segments {
            writeln!(
                out,
                "{:<20} {:>8} {:>5.1}%",
                seg.name,
                format_short(seg.total_ms),
                seg.percentage
            )?;
        }

        let grid = analytics::month_grid(year, month)
            .ok_or_else(|| StudyError::InvalidInput(format!("no such month {year}-{month:02}")))?;
        let totals = analytics::daily_totals(&sessions);
        writeln!(out)?;
        writeln!(out, "{year}-{month:02}")?;
        writeln!(out, "Su Mo Tu We Th Fr Sa")?;
        for week in grid.chunks(7) {
            if week.iter().all(Option::is_none) {
                continue;
            }
            let row: Vec<String> = week
                .iter()
                .map(|cell| match cell {
                    Some(day) => {
                        let ms = totals
                            .get(&day.format("%Y-%m-%d").to_string())
                            .copied()
                            .unwrap_or(0);
                        format!(" {}", Intensity::from_ms(ms).glyph())
                    }
                    None => "  ".to_string(),
                })
                .collect();
            writeln!(out, "{}", row.join(" ").trim_end())?;
        }
        Ok(())
    }
}

/// `YYYY-MM` into year and month
pub fn parse_month(month: &str) -> Result<(i32, u32)> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|d| (d.year(), d.month()))
        .map_err(|_| StudyError::InvalidInput(format!("expected YYYY-MM, got {month:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::FileConfigStore;
    use crate::kv::MemoryKeyValueStore;
    use crate::session::StudySession;
    use assert_matches::assert_matches;
    use tempfile::{tempdir, TempDir};

    // 2026-03-10T12:00:00Z, midday so the local date is the same in most zones
    const NOON: i64 = 1_773_144_000_000;

    fn env(dir: &TempDir) -> CommandEnv<MemoryKeyValueStore, ManualClock, FileConfigStore> {
        CommandEnv {
            kv: MemoryKeyValueStore::new(),
            clock: ManualClock::new(NOON),
            db: StudyDb::open_in_memory().unwrap(),
            config: FileConfigStore::with_path(dir.path().join("config.json")),
        }
    }

    fn run<K: KeyValueStore, C: Clock, CS: ConfigStore>(
        env: &mut CommandEnv<K, C, CS>,
        args: &[&str],
    ) -> Result<String> {
        let argv = std::iter::once("studysync").chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        env.run(cli.command.unwrap(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_cli_without_subcommand_opens_tui() {
        let cli = Cli::parse_from(["studysync"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["studysync", "start", "--subject", "cs", "--mode", "short-break"]);
        assert_eq!(
            cli.command,
            Some(Command::Start {
                subject: Some("cs".into()),
                mode: Some(TimerMode::ShortBreak)
            })
        );
        let cli = Cli::parse_from(["studysync", "goals", "add", "read ch. 3", "--date", "2026-01-02"]);
        assert_eq!(
            cli.command,
            Some(Command::Goals {
                date: Some("2026-01-02".into()),
                action: GoalsAction::Add {
                    text: "read ch. 3".into()
                }
            })
        );
    }

    #[test]
    fn test_cli_clear_requires_a_scope() {
        assert!(Cli::try_parse_from(["studysync", "clear"]).is_err());
        assert!(Cli::try_parse_from(["studysync", "clear", "--today", "--all"]).is_err());
        assert!(Cli::try_parse_from(["studysync", "history", "--all", "--date", "2026-01-01"]).is_err());
    }

    #[test]
    fn start_then_stop_in_separate_invocations_records_session() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        let out = run(&mut env, &["start", "--subject", "cs"]).unwrap();
        assert_eq!(out, "Started Stopwatch for Computer Science\n");

        env.clock.advance(90_000);
        let out = run(&mut env, &["status"]).unwrap();
        assert!(out.contains("status:  running"));
        assert!(out.contains("elapsed: 01:30"));

        let out = run(&mut env, &["stop"]).unwrap();
        assert_eq!(out, "Recorded 1m 30s of Computer Science\n");

        let sessions = env.db.all_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].subject_id, "cs");
        assert_eq!(sessions[0].duration_ms, 90_000);

        assert_eq!(run(&mut env, &["stop"]).unwrap(), "No active timer\n");
    }

    #[test]
    fn pause_excludes_paused_span() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["start"]).unwrap();
        env.clock.advance(10_000);
        assert_eq!(run(&mut env, &["pause"]).unwrap(), "Paused at 00:10\n");
        env.clock.advance(60_000);
        assert_eq!(run(&mut env, &["start"]).unwrap(), "Resumed Mathematics at 00:10\n");
        env.clock.advance(5_000);
        run(&mut env, &["stop"]).unwrap();

        assert_eq!(env.db.all_sessions().unwrap()[0].duration_ms, 15_000);
    }

    #[test]
    fn short_activity_is_discarded() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["start"]).unwrap();
        env.clock.advance(400);
        let out = run(&mut env, &["stop"]).unwrap();
        assert!(out.starts_with("Discarded"));
        assert!(env.db.all_sessions().unwrap().is_empty());
    }

    #[test]
    fn mode_is_remembered_and_locked_while_timing() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["mode", "pomodoro"]).unwrap();
        let out = run(&mut env, &["start"]).unwrap();
        assert_eq!(out, "Started Pomodoro for Mathematics\n");

        env.clock.advance(60_000);
        let out = run(&mut env, &["status"]).unwrap();
        assert!(out.contains("left:    24:00"));

        assert_matches!(run(&mut env, &["mode", "stopwatch"]), Err(StudyError::InvalidInput(_)));
        assert_matches!(
            run(&mut env, &["start", "--mode", "long-break"]),
            Err(StudyError::InvalidInput(_))
        );
    }

    #[test]
    fn subject_switch_reattributes_running_timer() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["start"]).unwrap();
        env.clock.advance(3_000);
        assert_eq!(run(&mut env, &["subject", "phys"]).unwrap(), "Subject set to Physics\n");
        env.clock.advance(2_000);
        run(&mut env, &["stop"]).unwrap();

        let sessions = env.db.all_sessions().unwrap();
        assert_eq!(sessions[0].subject_id, "phys");
        assert_eq!(sessions[0].duration_ms, 5_000);
        assert_eq!(env.config.load().default_subject, "phys");

        assert_matches!(run(&mut env, &["subject", "nope"]), Err(StudyError::NotFound(_)));
    }

    #[test]
    fn history_and_clear() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);
        let today = date_key(NOON);

        assert_eq!(run(&mut env, &["history"]).unwrap(), "No sessions\n");
        env.db
            .save_session(&StudySession::completed("math", NOON, 120_000))
            .unwrap();
        env.db
            .save_session(&StudySession::completed("lit", NOON - 86_400_000 * 3, 60_000))
            .unwrap();

        let out = run(&mut env, &["history"]).unwrap();
        assert!(out.contains(&today));
        assert!(out.contains("Mathematics"));
        assert!(!out.contains("Literature"));
        assert!(out.ends_with("total: 2m\n"));

        let out = run(&mut env, &["history", "--all"]).unwrap();
        assert!(out.contains("Literature"));

        run(&mut env, &["clear", "--today"]).unwrap();
        assert_eq!(env.db.all_sessions().unwrap().len(), 1);
        run(&mut env, &["clear", "--all"]).unwrap();
        assert!(env.db.all_sessions().unwrap().is_empty());

        assert_matches!(run(&mut env, &["history", "--date", "March"]), Err(StudyError::InvalidInput(_)));
    }

    #[test]
    fn subjects_lifecycle() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        let out = run(&mut env, &["subjects", "add", "Biology", "--color", "#22c55e"]).unwrap();
        assert!(out.starts_with("Added Biology"));
        assert_eq!(env.db.subjects().unwrap().len(), 7);

        assert_eq!(run(&mut env, &["subjects", "archive", "math"]).unwrap(), "Archived Mathematics\n");
        let listing = run(&mut env, &["subjects", "list"]).unwrap();
        let last = listing.lines().last().unwrap();
        assert!(last.contains("Mathematics") && last.contains("(archived)"));

        run(&mut env, &["subjects", "remove", "chem"]).unwrap();
        assert_matches!(
            run(&mut env, &["subjects", "remove", "chem"]),
            Err(StudyError::NotFound(_))
        );
        assert_matches!(
            run(&mut env, &["subjects", "add", "Art", "--color", "red"]),
            Err(StudyError::InvalidInput(_))
        );
    }

    #[test]
    fn goals_lifecycle() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["goals", "add", "Finish problem set"]).unwrap();
        let goal = env.db.goals_by_date(&date_key(NOON)).unwrap().remove(0);

        run(&mut env, &["goals", "done", &goal.id]).unwrap();
        let out = run(&mut env, &["goals", "list"]).unwrap();
        assert!(out.starts_with("[x] Finish problem set"));

        run(&mut env, &["goals", "remove", &goal.id]).unwrap();
        assert_eq!(
            run(&mut env, &["goals", "list", "--date", "2026-03-10"]).unwrap(),
            "No goals for 2026-03-10\n"
        );
        assert_matches!(run(&mut env, &["goals", "done", "missing"]), Err(StudyError::NotFound(_)));
    }

    #[test]
    fn unpadded_dates_key_the_same_day() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        run(&mut env, &["goals", "add", "Read", "--date", "2026-3-9"]).unwrap();
        let out = run(&mut env, &["goals", "list", "--date", "2026-03-09"]).unwrap();
        assert!(out.starts_with("[ ] Read"), "{out}");
        assert_eq!(env.db.goals_by_date("2026-03-09").unwrap().len(), 1);

        env.db
            .save_session(&StudySession::completed("math", NOON, 60_000))
            .unwrap();
        let day = date_key(NOON);
        let unpadded = parse_date(&day).unwrap().format("%Y-%-m-%-d").to_string();
        let out = run(&mut env, &["history", "--date", &unpadded]).unwrap();
        assert!(out.contains("Mathematics"), "{out}");

        run(&mut env, &["exams", "add", "--subject", "math", "Late", "2026-12-01"]).unwrap();
        run(&mut env, &["exams", "add", "--subject", "math", "Early", "2026-9-1"]).unwrap();
        let out = run(&mut env, &["exams", "list"]).unwrap();
        let early = out.find("Early").unwrap();
        let late = out.find("Late").unwrap();
        assert!(early < late, "{out}");
        assert!(out.contains("2026-09-01"));
    }

    #[test]
    fn task_board_lifecycle() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);

        assert_eq!(run(&mut env, &["tasks", "list"]).unwrap(), "No tasks\n");
        run(&mut env, &["tasks", "add", "Outline essay", "--subject", "lit"]).unwrap();
        run(&mut env, &["tasks", "add", "Problem set 4"]).unwrap();
        run(&mut env, &["tasks", "add", "Lab notes", "--status", "in-progress"]).unwrap();

        let board = env.db.tasks().unwrap();
        assert_eq!(board.len(), 3);
        let essay = board.iter().find(|t| t.title == "Outline essay").unwrap().clone();
        let problems = board.iter().find(|t| t.title == "Problem set 4").unwrap();
        assert_eq!(problems.subject_id, "math");

        env.clock.advance(1_000);
        let out = run(&mut env, &["tasks", "move", &essay.id, "done"]).unwrap();
        assert_eq!(out, "Moved Outline essay to Done\n");
        let moved = env.db.tasks().unwrap().into_iter().find(|t| t.id == essay.id).unwrap();
        assert_eq!(moved.status, TaskStatus::Done);
        assert_eq!(moved.updated_at, NOON + 1_000);

        let out = run(&mut env, &["tasks", "list"]).unwrap();
        assert!(out.contains("To Do (1)\n  Problem set 4 [Mathematics]"), "{out}");
        assert!(out.contains("In Progress (1)\n  Lab notes"));
        assert!(out.contains("Done (1)\n  Outline essay [Literature]"));

        run(&mut env, &["tasks", "remove", &essay.id]).unwrap();
        assert_eq!(env.db.tasks().unwrap().len(), 2);
        assert_matches!(
            run(&mut env, &["tasks", "remove", &essay.id]),
            Err(StudyError::NotFound(_))
        );
        assert_matches!(
            run(&mut env, &["tasks", "move", "missing", "todo"]),
            Err(StudyError::NotFound(_))
        );
        assert_matches!(
            run(&mut env, &["tasks", "add", "Orphan", "--subject", "nope"]),
            Err(StudyError::NotFound(_))
        );
        assert!(Cli::try_parse_from(["studysync", "tasks", "move", "x", "blocked"]).is_err());
    }

    #[test]
    fn exams_countdown() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);
        let in_five = (parse_date(&date_key(NOON)).unwrap() + chrono::Duration::days(5))
            .format("%Y-%m-%d")
            .to_string();

        run(&mut env, &["exams", "add", "--subject", "phys", "Midterm", &in_five, "--topics", "optics"]).unwrap();
        let out = run(&mut env, &["exams", "list"]).unwrap();
        assert!(out.contains("in 5 days"));
        assert!(out.contains("Midterm [Physics]"));
        assert!(out.contains("optics"));

        assert_matches!(
            run(&mut env, &["exams", "add", "--subject", "nope", "Final", &in_five]),
            Err(StudyError::NotFound(_))
        );
    }

    #[test]
    fn stats_report() {
        let dir = tempdir().unwrap();
        let mut env = env(&dir);
        env.db
            .save_session(&StudySession::completed("math", NOON, 2 * 3_600_000))
            .unwrap();

        let out = run(&mut env, &["stats"]).unwrap();
        assert!(out.contains("total:    2h 0m"));
        assert!(out.contains("sessions: 1"));
        assert!(out.contains("Mathematics"));
        assert!(out.contains("100.0%"));
        assert!(out.contains("Su Mo Tu We Th Fr Sa"));
        assert!(out.contains(Intensity::Medium.glyph()));

        assert_matches!(run(&mut env, &["stats", "--month", "2026-13"]), Err(StudyError::InvalidInput(_)));
    }

    #[test]
    fn parse_month_accepts_year_month() {
        assert_eq!(parse_month("2026-02").unwrap(), (2026, 2));
        assert!(parse_month("2026").is_err());
    }
}

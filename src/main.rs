use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

use studysync::{
    app::{App, AppAction},
    app_dirs::AppDirs,
    cli::{Cli, CommandEnv},
    clock::{Clock, SystemClock},
    config::{ConfigStore, FileConfigStore},
    db::StudyDb,
    kv::{FileKeyValueStore, KeyValueStore},
    recorder::BackgroundSessionWriter,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::{today_key, SessionSink},
    stopwatch::StopwatchController,
    timer_state::TimerStateStore,
};

/// Filter directives for the log output, e.g. `STUDYSYNC_LOG=debug`
const LOG_ENV: &str = "STUDYSYNC_LOG";

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(command) => {
            init_logging(false);
            let mut env = CommandEnv {
                kv: FileKeyValueStore::new(),
                clock: SystemClock,
                db: StudyDb::new()?,
                config: FileConfigStore::new(),
            };
            if let Err(e) = env.run(command, &mut io::stdout()) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            init_logging(true);
            run_tui()
        }
    }
}

/// Logs go to stderr for one-shot commands and to a file while the
/// alternate screen is up.
fn init_logging(to_file: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if !to_file {
        let _ = builder.with_writer(io::stderr).try_init();
        return;
    }
    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    // without a writable log file the TUI runs silently
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    }
}

fn run_tui() -> Result<(), Box<dyn Error>> {
    let config = FileConfigStore::new().load();
    let db = StudyDb::new()?;
    let subjects = db.subjects()?;
    let today = db.sessions_by_date(&today_key())?;
    let writer = BackgroundSessionWriter::spawn(db);

    let mut stopwatch = StopwatchController::new(
        TimerStateStore::new(FileKeyValueStore::new()),
        SystemClock,
        writer,
        config.default_subject.clone(),
    );
    stopwatch.set_mode(config.default_mode);
    stopwatch.restore();

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::from_millis(config.tick_rate_ms),
    );
    let mut app = App::new(stopwatch, config, subjects, &today);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner, &mut io::stdout());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Event loop. Frames are only produced while the timer runs; quitting
/// leaves a running timer persisted for the next launch. A finished
/// countdown rings the bell on `alert`.
fn start_tui<B, E, T, K, C, S, W>(
    terminal: &mut Terminal<B>,
    app: &mut App<K, C, S>,
    runner: &Runner<E, T>,
    alert: &mut W,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    W: Write,
    E: EventSource,
    T: Ticker,
    K: KeyValueStore,
    C: Clock,
    S: SessionSink,
{
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step(app.is_ticking()) {
            Some(AppEvent::Key(key)) => {
                if app.handle_key(key) == AppAction::Quit {
                    break;
                }
            }
            Some(AppEvent::Tick) => app.on_tick(),
            Some(AppEvent::Resize) => {}
            None => continue,
        }
        if app.take_bell() {
            alert.write_all(b"\x07")?;
            alert.flush()?;
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

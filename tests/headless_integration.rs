use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use studysync::{
    app::{App, AppAction},
    clock::ManualClock,
    config::Config,
    db::StudyDb,
    kv::MemoryKeyValueStore,
    models::default_subjects,
    runtime::{AppEvent, FixedTicker, Runner, TestEventSource},
    stopwatch::StopwatchController,
    timer_state::{TimerStateStore, TimerStatus},
};

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Headless flow through the runtime without a TTY: the runner only yields
// frames while the timer runs, and every frame re-derives elapsed time.
#[test]
fn headless_start_tick_stop_records_session() {
    let clock = ManualClock::new(chrono::Utc::now().timestamp_millis());
    let db = StudyDb::open_in_memory().unwrap();
    let stopwatch = StopwatchController::new(
        TimerStateStore::new(MemoryKeyValueStore::new()),
        clock.clone(),
        &db,
        "cs",
    );
    let mut app = App::new(stopwatch, Config::default(), default_subjects(), &[]);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(1)));

    // idle: nothing arrives, no frames
    assert!(runner.step(app.is_ticking()).is_none());

    tx.send(key(' ')).unwrap();
    match runner.step(app.is_ticking()) {
        Some(AppEvent::Key(k)) => assert_eq!(app.handle_key(k), AppAction::Continue),
        other => panic!("expected key, got {other:?}"),
    }
    assert!(app.is_ticking());

    for _ in 0..5 {
        clock.advance(1_000);
        match runner.step(app.is_ticking()) {
            Some(AppEvent::Tick) => app.on_tick(),
            other => panic!("expected tick, got {other:?}"),
        }
    }
    assert_eq!(app.stopwatch.elapsed_ms(), 5_000);
    assert_eq!(app.stopwatch.frame_loop().frames(), 5);

    tx.send(key('s')).unwrap();
    if let Some(AppEvent::Key(k)) = runner.step(app.is_ticking()) {
        app.handle_key(k);
    }
    assert_eq!(app.stopwatch.status(), TimerStatus::Idle);
    assert!(!app.is_ticking());
    assert_eq!(app.subject_today_ms(), 5_000);

    drop(app);
    let sessions = db.all_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].subject_id, "cs");
    assert_eq!(sessions[0].duration_ms, 5_000);
}

#[test]
fn headless_pause_stops_frames() {
    let clock = ManualClock::new(0);
    let db = StudyDb::open_in_memory().unwrap();
    let stopwatch = StopwatchController::new(
        TimerStateStore::new(MemoryKeyValueStore::new()),
        clock.clone(),
        &db,
        "math",
    );
    let mut app = App::new(stopwatch, Config::default(), default_subjects(), &[]);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(1)));

    tx.send(key(' ')).unwrap();
    tx.send(key(' ')).unwrap();
    for _ in 0..2 {
        if let Some(AppEvent::Key(k)) = runner.step(app.is_ticking()) {
            app.handle_key(k);
        }
    }
    assert_eq!(app.stopwatch.status(), TimerStatus::Paused);
    assert!(runner.step(app.is_ticking()).is_none());
}

// A timer survives the process that started it: a fresh controller over the
// same storage file reconstructs elapsed time from the persisted timestamps.

use studysync::{
    clock::ManualClock,
    db::StudyDb,
    kv::{FileKeyValueStore, KeyValueStore},
    recorder::BackgroundSessionWriter,
    stopwatch::StopwatchController,
    timer_state::{TimerMode, TimerStateStore, TimerStatus, STORAGE_KEY},
};
use tempfile::tempdir;

#[test]
fn running_timer_resumes_after_reload() {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("storage.json");
    let db_path = dir.path().join("studysync.db");
    let clock = ManualClock::new(1_700_000_000_000);

    {
        let mut first = StopwatchController::new(
            TimerStateStore::new(FileKeyValueStore::with_path(&storage)),
            clock.clone(),
            StudyDb::open(&db_path).unwrap(),
            "chem",
        );
        first.set_mode(TimerMode::Pomodoro);
        first.start();
        clock.advance(30_000);
        first.pause();
        clock.advance(120_000);
        first.start();
        // process exits while running
    }

    clock.advance(45_000);
    let writer = BackgroundSessionWriter::spawn(StudyDb::open(&db_path).unwrap());
    let mut second = StopwatchController::new(
        TimerStateStore::new(FileKeyValueStore::with_path(&storage)),
        clock.clone(),
        writer,
        "math",
    );
    second.restore();

    assert_eq!(second.status(), TimerStatus::Running);
    assert_eq!(second.mode(), TimerMode::Pomodoro);
    assert_eq!(second.current_subject_id(), "chem");
    assert_eq!(second.elapsed_ms(), 75_000);
    assert!(second.is_ticking());

    let session = second.stop().unwrap();
    assert_eq!(session.duration_ms, 75_000);
    drop(second);

    let sessions = StudyDb::open(&db_path).unwrap().all_sessions().unwrap();
    assert_eq!(sessions, vec![session]);
    let kv = FileKeyValueStore::with_path(&storage);
    assert_eq!(kv.get(STORAGE_KEY).unwrap(), None);
}

#[test]
fn paused_timer_does_not_advance_while_closed() {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("storage.json");
    let clock = ManualClock::new(5_000_000);
    let db = StudyDb::open_in_memory().unwrap();

    let mut first = StopwatchController::new(
        TimerStateStore::new(FileKeyValueStore::with_path(&storage)),
        clock.clone(),
        &db,
        "lit",
    );
    first.start();
    clock.advance(12_000);
    first.pause();
    drop(first);

    clock.advance(3_600_000);
    let mut second = StopwatchController::new(
        TimerStateStore::new(FileKeyValueStore::with_path(&storage)),
        clock.clone(),
        &db,
        "lit",
    );
    second.restore();
    assert_eq!(second.status(), TimerStatus::Paused);
    assert_eq!(second.elapsed_ms(), 12_000);
    assert!(!second.is_ticking());
}

#[test]
fn stop_in_one_process_cancels_frames_in_another() {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("storage.json");
    let clock = ManualClock::new(0);
    let db = StudyDb::open_in_memory().unwrap();
    let controller = |subject: &str| {
        StopwatchController::new(
            TimerStateStore::new(FileKeyValueStore::with_path(&storage)),
            clock.clone(),
            &db,
            subject.to_string(),
        )
    };

    let mut screen = controller("math");
    screen.start();
    clock.advance(2_000);
    assert!(screen.tick());

    let mut other = controller("math");
    other.restore();
    clock.advance(1_000);
    other.stop().unwrap();

    assert!(!screen.tick());
    assert!(!screen.is_ticking());
    assert_eq!(db.all_sessions().unwrap()[0].duration_ms, 3_000);
}

#[test]
fn corrupt_storage_reads_as_no_timer() {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("storage.json");
    let kv = FileKeyValueStore::with_path(&storage);
    kv.set(STORAGE_KEY, r#"{"status":"running","accumulatedTime":-5}"#)
        .unwrap();

    let mut controller = StopwatchController::new(
        TimerStateStore::new(kv),
        ManualClock::new(0),
        StudyDb::open_in_memory().unwrap(),
        "math",
    );
    controller.restore();
    assert_eq!(controller.status(), TimerStatus::Idle);
    assert_eq!(controller.elapsed_ms(), 0);
}

//! Fire-and-forget persistence of completed sessions.

use std::io;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::db::StudyDb;
use crate::error::{Result, StudyError};
use crate::session::{SessionSink, StudySession};

/// Owns a database connection on a worker thread and writes sessions in the
/// order they were handed over. Dropping the writer drains the queue first.
#[derive(Debug)]
pub struct BackgroundSessionWriter {
    tx: Option<Sender<StudySession>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSessionWriter {
    pub fn spawn(db: StudyDb) -> Self {
        Self::spawn_with(db, |_| {})
    }

    /// Like [`spawn`](Self::spawn), calling `on_saved` after each successful write
    pub fn spawn_with<F>(db: StudyDb, on_saved: F) -> Self
    where
        F: Fn(&StudySession) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<StudySession>();
        let handle = thread::spawn(move || {
            for session in rx {
                match db.save_session(&session) {
                    Ok(()) => {
                        debug!(id = %session.id, duration_ms = session.duration_ms, "Session saved");
                        on_saved(&session);
                    }
                    Err(e) => error!(id = %session.id, error = %e, "Failed to save session"),
                }
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }
}

impl SessionSink for BackgroundSessionWriter {
    fn create(&self, session: &StudySession) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(writer_stopped)?;
        tx.send(session.clone()).map_err(|_| writer_stopped())
    }
}

fn writer_stopped() -> StudyError {
    StudyError::Storage(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "session writer has stopped",
    ))
}

impl Drop for BackgroundSessionWriter {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Session writer thread panicked");
            }
        }
    }
}

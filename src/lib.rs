// Library surface for headless/integration tests and reuse.
// The binary only wires terminals, logging and real storage onto it.
pub mod analytics;
pub mod app;
pub mod app_dirs;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod elapsed;
pub mod error;
pub mod kv;
pub mod models;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod stopwatch;
pub mod timer_state;
pub mod ui;
pub mod util;

pub mod daemon;
pub mod listener;
pub mod store;

pub use daemon::{daemon_status, run_daemon_worker, start_daemon, stop_daemon};
pub use store::{Database, JsonStore, DEFAULT_BUNDLE};

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KlexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed hotstring identifier: {0}")]
    MalformedIdentifier(String),
    #[error("bundle '{0}' unavailable: {1}")]
    BundleUnavailable(String, String),
    #[error("expansion cancelled by user")]
    ExpansionCancelled,
    #[error("candidate exceeded {0} characters without a match")]
    UnboundedCandidate(usize),
    #[error("output delivery failed: {0}")]
    OutputDelivery(String),
    #[error("keyboard controller error: {0}")]
    Keyboard(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("database not found at: {0}")]
    DatabaseNotFound(String),
    #[error("daemon already running with PID {0}")]
    DaemonAlreadyRunning(u32),
    #[error("daemon is not running")]
    DaemonNotRunning,
    #[error("invalid PID in daemon file")]
    InvalidPid,
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KlexError>;

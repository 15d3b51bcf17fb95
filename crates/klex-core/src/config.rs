use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;

pub const PID_FILENAME: &str = "klex-daemon.pid";
pub const DB_FILENAME: &str = "klex.json";

/// Get the klex configuration directory (`~/.klex`).
pub fn get_config_dir() -> PathBuf {
    env::var("KLEX_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".klex")))
        .unwrap_or_else(|_| PathBuf::from(".klex"))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

/// Get the path to the PID file.
pub fn get_pid_file_path() -> PathBuf {
    get_config_dir().join(PID_FILENAME)
}

/// Get the path to the database file.
pub fn get_db_file_path() -> PathBuf {
    get_config_dir().join(DB_FILENAME)
}

/// Check if the daemon appears to be running, by PID file.
pub fn is_daemon_running() -> Result<Option<u32>> {
    let pid_file = get_pid_file_path();

    if !pid_file.exists() {
        return Ok(None);
    }

    match fs::read_to_string(&pid_file) {
        Ok(contents) => match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                // Invalid PID, treat as not running and clean up
                let _ = fs::remove_file(&pid_file);
                Ok(None)
            }
        },
        Err(_) => {
            let _ = fs::remove_file(&pid_file);
            Ok(None)
        }
    }
}

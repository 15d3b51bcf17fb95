//! Daemon lifecycle: PID file management, detached worker spawn, and the
//! worker loop itself (engine + listener + store watcher).

use std::fs;
use std::process;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use klex_core::config::{ensure_config_dir, get_pid_file_path, is_daemon_running};
use klex_core::{
    ExpansionEngine, IndexHandle, KlexError, Result, SilentPrompt, SystemClipboard,
};

use crate::listener::{start_engine_thread, start_keyboard_listener, EVENT_QUEUE_DEPTH};
use crate::store::JsonStore;

/// How often the worker checks the database file for edits.
const STORE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Start the daemon as a detached background process.
pub fn start_daemon() -> Result<()> {
    if let Some(pid) = is_daemon_running()? {
        if process_running(pid) {
            return Err(KlexError::DaemonAlreadyRunning(pid));
        }
        // Stale PID file: clean up and start fresh.
        let _ = fs::remove_file(get_pid_file_path());
    }

    let config_dir = ensure_config_dir()?;
    JsonStore::new().ensure_initialized()?;

    let current_exe = std::env::current_exe()?;
    let log_file = config_dir.join("daemon.log");

    #[cfg(unix)]
    {
        use std::process::Command;
        let cmd = format!(
            "nohup {} daemon-worker > {} 2>&1 &",
            current_exe.to_string_lossy(),
            log_file.to_string_lossy()
        );
        Command::new("sh").arg("-c").arg(&cmd).status()?;
    }

    #[cfg(windows)]
    {
        use std::process::Command;
        let cmd = format!(
            "START /B \"klex daemon\" \"{}\" daemon-worker > \"{}\" 2>&1",
            current_exe.to_string_lossy(),
            log_file.to_string_lossy()
        );
        Command::new("cmd").arg("/C").arg(&cmd).status()?;
    }

    // Wait for the worker to write its PID file.
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(100));
        if let Some(pid) = is_daemon_running()? {
            if process_running(pid) {
                println!("Daemon started with PID {}.", pid);
                return Ok(());
            }
        }
    }

    Err(KlexError::Other(format!(
        "daemon failed to start; check logs at {}",
        log_file.to_string_lossy()
    )))
}

/// Stop a running daemon.
pub fn stop_daemon() -> Result<()> {
    let pid = is_daemon_running()?.ok_or(KlexError::DaemonNotRunning)?;
    if !process_running(pid) {
        let _ = fs::remove_file(get_pid_file_path());
        return Err(KlexError::DaemonNotRunning);
    }

    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("kill").arg(pid.to_string()).status()?;
    }
    #[cfg(windows)]
    {
        use std::process::Command;
        Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .status()?;
    }

    let _ = fs::remove_file(get_pid_file_path());
    println!("Daemon with PID {} stopped.", pid);
    Ok(())
}

/// Report daemon status to stdout.
pub fn daemon_status() -> Result<()> {
    match is_daemon_running()? {
        Some(pid) if process_running(pid) => println!("Daemon is running with PID {}.", pid),
        Some(_) | None => println!("Daemon is not running."),
    }
    Ok(())
}

/// Check whether a PID refers to a live process.
pub fn process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use std::process::Command;
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
    #[cfg(windows)]
    {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid)])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }
}

/// The worker process: builds the engine with real collaborators and runs
/// until killed.
pub fn run_daemon_worker() -> Result<()> {
    ensure_config_dir()?;
    let pid_file = get_pid_file_path();
    fs::write(&pid_file, process::id().to_string())?;

    let store = JsonStore::new();
    let db = store.ensure_initialized()?;
    info!(db = %store.path().display(), bundles = db.bundles.len(), "daemon worker starting");

    let index = Arc::new(IndexHandle::new());
    let loaded = index.rebuild(&store);
    info!(hotstrings = loaded, "trigger index built");

    let engine = ExpansionEngine::new(
        index.clone(),
        db.config,
        Box::new(SystemClipboard::new()),
        // %p needs a GUI; headless runs resolve it to empty text.
        Box::new(SilentPrompt),
        Box::new(klex_core::keyboard::EnigoOutput::new()),
        Box::new(store.clone()),
    );

    let running = Arc::new(Mutex::new(true));
    let (tx, rx) = sync_channel(EVENT_QUEUE_DEPTH);

    let engine_handle = start_engine_thread(rx, engine);
    let _listener_handle = start_keyboard_listener(tx, Arc::clone(&running));
    start_store_watcher(store, Arc::clone(&index), Arc::clone(&running));

    // rdev::listen never returns under normal operation; park on the
    // engine thread so the worker stays alive.
    engine_handle
        .join()
        .map_err(|_| KlexError::Other("engine thread panicked".to_string()))?;

    *running.lock().unwrap() = false;
    let _ = fs::remove_file(&pid_file);
    Ok(())
}

/// Republish the trigger index whenever the database file changes, so
/// CLI edits reach the live engine without a restart.
fn start_store_watcher(store: JsonStore, index: Arc<IndexHandle>, running: Arc<Mutex<bool>>) {
    thread::spawn(move || {
        let mut last_seen = store.mtime();
        while *running.lock().unwrap() {
            thread::sleep(STORE_POLL_INTERVAL);
            let current = store.mtime();
            if current != last_seen {
                last_seen = current;
                let count = index.rebuild(&store);
                info!(hotstrings = count, "database changed, index republished");
            }
        }
        warn!("store watcher stopped");
    });
}

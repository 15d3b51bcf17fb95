//! Keyboard listener: bridges the OS hook to the engine thread.
//!
//! The `rdev` callback decodes each event and pushes it into a bounded
//! channel. `SyncSender::send` blocks when the engine falls behind, so
//! keystrokes are back-pressured rather than dropped; losing a
//! reset-class key would corrupt match state.

use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rdev::{self, EventType};
use tracing::{error, info, warn};

use klex_core::keyboard::{decode_key, ModifierTracker};
use klex_core::{ExpansionEngine, KeyEvent, KeyStroke};

/// Bounded queue between the OS hook and the engine thread.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Spawn the OS hook thread. Blocks inside `rdev::listen`; retried a few
/// times because hooks occasionally fail right after permission grants.
pub fn start_keyboard_listener(
    tx: SyncSender<KeyEvent>,
    running: Arc<Mutex<bool>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let tracker = Arc::new(Mutex::new(ModifierTracker::new()));

        let callback = {
            let running = Arc::clone(&running);
            let tracker = Arc::clone(&tracker);
            move |event: rdev::Event| {
                if !*running.lock().unwrap() {
                    return;
                }

                let decoded = match event.event_type {
                    EventType::KeyPress(key) => {
                        let mut tracker = tracker.lock().unwrap();
                        if tracker.update(&key, true) {
                            None
                        } else {
                            decode_key(&key, &event, tracker.current())
                        }
                    }
                    EventType::KeyRelease(key) => {
                        tracker.lock().unwrap().update(&key, false);
                        None
                    }
                    EventType::ButtonPress(_) => Some(KeyEvent::of(KeyStroke::MouseClick)),
                    _ => None,
                };

                if let Some(event) = decoded {
                    // Blocking send: backpressure instead of dropping.
                    if tx.send(event).is_err() {
                        warn!("engine thread gone, dropping keyboard event");
                    }
                }
            }
        };

        let max_retries = 5;
        let mut retry_count = 0;
        while *running.lock().unwrap() && retry_count < max_retries {
            match rdev::listen(callback.clone()) {
                Ok(_) => break,
                Err(e) => {
                    retry_count += 1;
                    error!(
                        attempt = retry_count,
                        max_retries,
                        "keyboard listener failed: {:?}",
                        e
                    );
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }

        if retry_count >= max_retries {
            error!("giving up on keyboard listener after {} attempts", max_retries);
        }
    })
}

/// Drain the event queue on a dedicated thread, strictly in arrival order.
pub fn start_engine_thread(
    rx: Receiver<KeyEvent>,
    mut engine: ExpansionEngine,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("expansion engine thread started");
        while let Ok(event) = rx.recv() {
            if let Err(err) = engine.handle_event(event) {
                // A cancelled prompt or failed delivery aborts only that
                // one expansion; matching continues.
                warn!(error = %err, "expansion aborted");
            }
        }
        info!("expansion engine thread stopped");
    })
}

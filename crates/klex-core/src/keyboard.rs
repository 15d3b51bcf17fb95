//! Keyboard adapters: decoding `rdev` events into engine [`KeyEvent`]s and
//! an `enigo`-backed [`OutputSink`] for keystroke injection.

use enigo::Keyboard;
use enigo::{Direction, Enigo, Key, Settings};
use rdev::{self, Key as RdevKey};
use std::thread;
use std::time::Duration;

use crate::engine::OutputSink;
use crate::error::{KlexError, Result};
use crate::matcher::{KeyEvent, KeyStroke, Modifiers, TriggerKey};

/// Tracks held modifier keys across press/release events. The listener
/// feeds every raw event through this before decoding, so each decoded
/// keystroke carries the modifier state sampled at that moment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifierTracker {
    state: Modifiers,
}

impl ModifierTracker {
    pub fn new() -> ModifierTracker {
        ModifierTracker::default()
    }

    pub fn current(&self) -> Modifiers {
        self.state
    }

    /// Returns true when the key was a modifier (and therefore not a
    /// keystroke to decode).
    pub fn update(&mut self, key: &RdevKey, pressed: bool) -> bool {
        match key {
            RdevKey::Alt | RdevKey::AltGr => self.state.alt = pressed,
            RdevKey::ControlLeft | RdevKey::ControlRight => self.state.ctrl = pressed,
            RdevKey::ShiftLeft | RdevKey::ShiftRight => self.state.shift = pressed,
            RdevKey::MetaLeft | RdevKey::MetaRight => self.state.win = pressed,
            _ => return false,
        }
        true
    }
}

/// Decode one `rdev` key press into an engine keystroke. Returns `None`
/// for keys the engine does not care about (lock keys, media keys, ...).
pub fn decode_key(key: &RdevKey, event: &rdev::Event, modifiers: Modifiers) -> Option<KeyEvent> {
    let stroke = match key {
        RdevKey::Return => KeyStroke::Trigger(TriggerKey::Enter),
        RdevKey::Tab => KeyStroke::Trigger(TriggerKey::Tab),
        RdevKey::Space => KeyStroke::Trigger(TriggerKey::Space),
        RdevKey::Backspace => KeyStroke::Backspace,
        RdevKey::Escape
        | RdevKey::LeftArrow
        | RdevKey::RightArrow
        | RdevKey::UpArrow
        | RdevKey::DownArrow
        | RdevKey::Home
        | RdevKey::End
        | RdevKey::PageUp
        | RdevKey::PageDown
        | RdevKey::Delete
        | RdevKey::F1
        | RdevKey::F2
        | RdevKey::F3
        | RdevKey::F4
        | RdevKey::F5
        | RdevKey::F6
        | RdevKey::F7
        | RdevKey::F8
        | RdevKey::F9
        | RdevKey::F10
        | RdevKey::F11
        | RdevKey::F12 => KeyStroke::Reset,
        _ => KeyStroke::Char(key_to_char(event)?),
    };
    Some(KeyEvent {
        stroke,
        modifiers,
        window: None,
    })
}

/// Resolve a printable character from the event's layout-resolved name.
fn key_to_char(event: &rdev::Event) -> Option<char> {
    let name = event.name.as_ref()?;
    let mut chars = name.chars();
    let c = chars.next()?;
    // Multi-character names are dead keys or control sequences.
    if chars.next().is_some() || c.is_control() {
        return None;
    }
    Some(c)
}

/// Create a keyboard controller.
pub fn create_keyboard_controller() -> Result<Enigo> {
    let settings = Settings::default();
    Enigo::new(&settings)
        .map_err(|err| KlexError::Keyboard(format!("failed to create keyboard controller: {}", err)))
}

/// Keystroke-injection output sink backed by `enigo`. A fresh controller
/// is created per delivery call; holding one across threads is not
/// portable on every platform.
pub struct EnigoOutput;

impl EnigoOutput {
    pub fn new() -> EnigoOutput {
        EnigoOutput
    }
}

impl Default for EnigoOutput {
    fn default() -> Self {
        EnigoOutput::new()
    }
}

fn click(keyboard: &mut Enigo, key: Key, what: &str) -> Result<()> {
    keyboard
        .key(key, Direction::Click)
        .map_err(|err| KlexError::OutputDelivery(format!("failed to send {}: {}", what, err)))
}

impl OutputSink for EnigoOutput {
    fn delete_chars(&mut self, n: usize) -> Result<()> {
        let mut keyboard = create_keyboard_controller()?;
        for _ in 0..n {
            // Small delay so the target app keeps up with the deletions.
            thread::sleep(Duration::from_millis(2));
            click(&mut keyboard, Key::Backspace, "backspace")?;
        }
        Ok(())
    }

    fn emit_text(&mut self, text: &str) -> Result<()> {
        // Avoid overwhelming the keyboard buffer on long replacements.
        const CHUNK_SIZE: usize = 512;

        let mut keyboard = create_keyboard_controller()?;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                click(&mut keyboard, Key::Return, "newline")?;
                thread::sleep(Duration::from_millis(15));
            }

            if line.is_empty() {
                continue;
            }

            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(CHUNK_SIZE) {
                let chunk_str: String = chunk.iter().collect();
                keyboard.text(&chunk_str).map_err(|err| {
                    KlexError::OutputDelivery(format!("failed to type text: {}", err))
                })?;
                thread::sleep(Duration::from_millis(10));
            }
        }
        Ok(())
    }

    fn move_cursor_left(&mut self, n: usize) -> Result<()> {
        let mut keyboard = create_keyboard_controller()?;
        for _ in 0..n {
            click(&mut keyboard, Key::LeftArrow, "cursor left")?;
        }
        Ok(())
    }

    fn paste_via_clipboard(&mut self) -> Result<()> {
        #[cfg(target_os = "macos")]
        let chord = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let chord = Key::Control;

        let mut keyboard = create_keyboard_controller()?;
        keyboard
            .key(chord, Direction::Press)
            .map_err(|err| KlexError::OutputDelivery(format!("failed to press paste chord: {}", err)))?;
        let result = click(&mut keyboard, Key::Unicode('v'), "paste");
        let _ = keyboard.key(chord, Direction::Release);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(key: RdevKey, name: Option<&str>) -> rdev::Event {
        rdev::Event {
            time: std::time::SystemTime::now(),
            name: name.map(str::to_string),
            event_type: rdev::EventType::KeyPress(key),
        }
    }

    #[test]
    fn decodes_trigger_keys() {
        let ev = key_event(RdevKey::Space, Some(" "));
        let decoded = decode_key(&RdevKey::Space, &ev, Modifiers::NONE).unwrap();
        assert_eq!(decoded.stroke, KeyStroke::Trigger(TriggerKey::Space));

        let ev = key_event(RdevKey::Return, Some("\r"));
        let decoded = decode_key(&RdevKey::Return, &ev, Modifiers::NONE).unwrap();
        assert_eq!(decoded.stroke, KeyStroke::Trigger(TriggerKey::Enter));
    }

    #[test]
    fn decodes_reset_class_keys() {
        for key in [RdevKey::Escape, RdevKey::LeftArrow, RdevKey::F5, RdevKey::Home] {
            let ev = key_event(key, None);
            let decoded = decode_key(&key, &ev, Modifiers::NONE).unwrap();
            assert_eq!(decoded.stroke, KeyStroke::Reset);
        }
    }

    #[test]
    fn decodes_printable_characters_from_event_name() {
        let ev = key_event(RdevKey::KeyB, Some("b"));
        let decoded = decode_key(&RdevKey::KeyB, &ev, Modifiers::NONE).unwrap();
        assert_eq!(decoded.stroke, KeyStroke::Char('b'));
    }

    #[test]
    fn ignores_unnamed_keys() {
        let ev = key_event(RdevKey::CapsLock, None);
        assert!(decode_key(&RdevKey::CapsLock, &ev, Modifiers::NONE).is_none());
    }

    #[test]
    fn modifier_tracker_follows_press_release() {
        let mut tracker = ModifierTracker::new();
        assert!(tracker.update(&RdevKey::ControlLeft, true));
        assert!(tracker.current().ctrl);
        assert!(tracker.update(&RdevKey::ControlLeft, false));
        assert!(!tracker.current().ctrl);
        assert!(!tracker.update(&RdevKey::KeyA, true));
    }
}

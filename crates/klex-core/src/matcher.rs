//! Match buffer: the input state machine.
//!
//! Consumes one decoded key event at a time, accumulates the candidate
//! string, and decides when the candidate is a registered hotstring for
//! the pending trigger. Classification order is load-bearing:
//!
//! 1. reset-class keys clear the candidate, but the same keystroke is
//!    simultaneously evaluated as a trigger for the just-accumulated text
//! 2. backspace trims exactly one character
//! 3. autocorrect membership is checked before everything else
//! 4. instant hotstrings fire on every accumulation step
//! 5. enter/tab/space hotstrings fire only on their trigger key
//!
//! Owned exclusively by the engine thread; events are processed strictly
//! in arrival order.

use tracing::debug;

use crate::codec;
use crate::error::KlexError;
use crate::index::TriggerIndex;
use crate::models::TriggerClass;

/// Modifier-key state sampled at the moment of a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub win: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        shift: false,
        win: false,
    };

    /// Shift is ordinary typing; Alt/Ctrl/Win make the keystroke a chord
    /// rather than text input.
    pub fn is_chorded(&self) -> bool {
        self.alt || self.ctrl || self.win
    }
}

/// A trigger key: confirms a pending candidate for its class and doubles
/// as a word boundary when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKey {
    Enter,
    Tab,
    Space,
}

impl TriggerKey {
    pub fn class(self) -> TriggerClass {
        match self {
            TriggerKey::Enter => TriggerClass::Enter,
            TriggerKey::Tab => TriggerClass::Tab,
            TriggerKey::Space => TriggerClass::Space,
        }
    }
}

/// One decoded keystroke, already classified by the key event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStroke {
    /// Printable character.
    Char(char),
    /// Removes one candidate character; forwarded downstream literally.
    Backspace,
    /// Enter, Tab or Space.
    Trigger(TriggerKey),
    /// Navigation/escape/function keys: arrows, Home, End, PgUp, PgDn,
    /// Delete, Escape, F1..F12.
    Reset,
    /// Any mouse button press.
    MouseClick,
}

/// A key event in strict temporal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub stroke: KeyStroke,
    pub modifiers: Modifiers,
    /// Opaque identity of the focused window at event time, if the source
    /// tracks one.
    pub window: Option<String>,
}

impl KeyEvent {
    pub fn of(stroke: KeyStroke) -> KeyEvent {
        KeyEvent {
            stroke,
            modifiers: Modifiers::NONE,
            window: None,
        }
    }

    pub fn ch(c: char) -> KeyEvent {
        KeyEvent::of(KeyStroke::Char(c))
    }
}

/// Everything the expander and action builder need about one confirmed
/// match. Created when the match is confirmed, discarded after the action
/// list is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionContext {
    /// Encoded identity of the matched hotstring.
    pub encoded: String,
    /// Decoded display text, exactly what the user typed.
    pub typed: String,
    /// Which class confirmed the match.
    pub trigger: TriggerClass,
    /// Modifier state at the confirming keystroke.
    pub modifiers: Modifiers,
    pub window: Option<String>,
}

/// What the buffer decided for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The keystroke passes through to the focused application untouched.
    PassThrough,
    /// A hotstring fired; the buffer is already back to idle.
    Matched(ExpansionContext),
}

/// Observable buffer state (for tests and diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Idle,
    Accumulating,
    MatchPending,
}

/// The per-session mutable accumulator. Single-threaded by design.
#[derive(Debug, Default)]
pub struct MatchBuffer {
    candidate: String,
    candidate_slack: usize,
}

impl MatchBuffer {
    pub fn new(candidate_slack: usize) -> MatchBuffer {
        MatchBuffer {
            candidate: String::new(),
            candidate_slack,
        }
    }

    /// The accumulated candidate text.
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    /// Clear the candidate. Idempotent.
    pub fn reset(&mut self) {
        self.candidate.clear();
    }

    pub fn state(&self, index: &TriggerIndex) -> BufferState {
        if self.candidate.is_empty() {
            BufferState::Idle
        } else if index.classify(&self.candidate).is_empty() {
            BufferState::Accumulating
        } else {
            BufferState::MatchPending
        }
    }

    /// Process one key event against the given index snapshot.
    pub fn handle_event(
        &mut self,
        event: KeyEvent,
        index: &TriggerIndex,
        autocorrect_enabled: bool,
    ) -> KeyOutcome {
        match event.stroke {
            KeyStroke::MouseClick => {
                self.reset();
                KeyOutcome::PassThrough
            }
            KeyStroke::Reset => {
                self.reset();
                KeyOutcome::PassThrough
            }
            KeyStroke::Backspace => {
                self.candidate.pop();
                KeyOutcome::PassThrough
            }
            KeyStroke::Trigger(key) => {
                // The trigger key is reset-class: take the candidate out
                // first, then evaluate the same keystroke as the trigger
                // for the text it just terminated.
                let candidate = std::mem::take(&mut self.candidate);
                if candidate.is_empty() || event.modifiers.is_chorded() {
                    return KeyOutcome::PassThrough;
                }
                let encoded = codec::encode(&candidate);
                if index.contains(key.class(), &encoded) {
                    KeyOutcome::Matched(ExpansionContext {
                        encoded,
                        typed: candidate,
                        trigger: key.class(),
                        modifiers: event.modifiers,
                        window: event.window,
                    })
                } else {
                    KeyOutcome::PassThrough
                }
            }
            KeyStroke::Char(c) => {
                if event.modifiers.is_chorded() {
                    // A chord is a command, not typing; whatever it did to
                    // the target, the candidate no longer mirrors it.
                    self.reset();
                    return KeyOutcome::PassThrough;
                }
                self.candidate.push(c);

                let cap = index.longest() + self.candidate_slack;
                if self.candidate.chars().count() > cap {
                    // No registered hotstring of this length exists, so
                    // nothing accumulated here can ever match.
                    debug!(error = %KlexError::UnboundedCandidate(cap), "candidate guard tripped");
                    self.reset();
                    return KeyOutcome::PassThrough;
                }

                let encoded = codec::encode(&self.candidate);
                let matched = if autocorrect_enabled
                    && index.contains(TriggerClass::Autocorrect, &encoded)
                {
                    Some(TriggerClass::Autocorrect)
                } else if index.contains(TriggerClass::Instant, &encoded) {
                    Some(TriggerClass::Instant)
                } else {
                    None
                };

                match matched {
                    Some(trigger) => {
                        let typed = std::mem::take(&mut self.candidate);
                        KeyOutcome::Matched(ExpansionContext {
                            encoded,
                            typed,
                            trigger,
                            modifiers: event.modifiers,
                            window: event.window,
                        })
                    }
                    None => KeyOutcome::PassThrough,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::index::{HotstringStore, TriggerIndex};
    use crate::models::StoredHotstring;

    struct FixedStore(Vec<StoredHotstring>);

    impl HotstringStore for FixedStore {
        fn enabled_bundles(&self) -> Vec<String> {
            vec!["Default".to_string()]
        }

        fn hotstrings_in(&self, _bundle: &str) -> Result<Vec<StoredHotstring>> {
            Ok(self.0.clone())
        }
    }

    fn index(hotstrings: Vec<StoredHotstring>) -> TriggerIndex {
        TriggerIndex::build(&FixedStore(hotstrings), 1)
    }

    fn type_str(buffer: &mut MatchBuffer, index: &TriggerIndex, text: &str) -> Vec<KeyOutcome> {
        text.chars()
            .map(|c| buffer.handle_event(KeyEvent::ch(c), index, false))
            .collect()
    }

    #[test]
    fn space_trigger_confirms_match() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);

        for outcome in type_str(&mut buf, &idx, "btw") {
            assert_eq!(outcome, KeyOutcome::PassThrough);
        }
        assert_eq!(buf.state(&idx), BufferState::MatchPending);

        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Space)),
            &idx,
            false,
        );
        match outcome {
            KeyOutcome::Matched(ctx) => {
                assert_eq!(ctx.typed, "btw");
                assert_eq!(ctx.trigger, TriggerClass::Space);
            }
            other => panic!("expected match, got {:?}", other),
        }
        assert_eq!(buf.state(&idx), BufferState::Idle);
    }

    #[test]
    fn wrong_trigger_class_passes_through_and_resets() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);

        type_str(&mut buf, &idx, "btw");
        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Enter)),
            &idx,
            false,
        );
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn instant_fires_without_delimiter() {
        let idx = index(vec![StoredHotstring::new(
            "omw",
            "on my way!",
            &[TriggerClass::Instant],
        )]);
        let mut buf = MatchBuffer::new(16);

        let outcomes = type_str(&mut buf, &idx, "omw");
        assert_eq!(outcomes[0], KeyOutcome::PassThrough);
        assert_eq!(outcomes[1], KeyOutcome::PassThrough);
        match &outcomes[2] {
            KeyOutcome::Matched(ctx) => {
                assert_eq!(ctx.typed, "omw");
                assert_eq!(ctx.trigger, TriggerClass::Instant);
            }
            other => panic!("expected match, got {:?}", other),
        }
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn autocorrect_requires_feature_flag() {
        let idx = index(vec![StoredHotstring::new(
            "teh",
            "the",
            &[TriggerClass::Autocorrect],
        )]);
        let mut buf = MatchBuffer::new(16);

        // Flag off: never fires, on any path.
        for outcome in type_str(&mut buf, &idx, "teh") {
            assert_eq!(outcome, KeyOutcome::PassThrough);
        }
        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Space)),
            &idx,
            false,
        );
        assert_eq!(outcome, KeyOutcome::PassThrough);

        // Flag on: fires on the accumulation step.
        buf.reset();
        let outcomes: Vec<_> = "teh"
            .chars()
            .map(|c| buf.handle_event(KeyEvent::ch(c), &idx, true))
            .collect();
        assert!(matches!(
            &outcomes[2],
            KeyOutcome::Matched(ctx) if ctx.trigger == TriggerClass::Autocorrect
        ));
    }

    #[test]
    fn autocorrect_beats_instant_for_same_candidate() {
        // Two bundles define "teh": autocorrect last. With the flag on
        // the autocorrect classification is checked first.
        let idx = index(vec![StoredHotstring::new(
            "teh",
            "the",
            &[TriggerClass::Autocorrect],
        )]);
        let mut buf = MatchBuffer::new(16);
        let outcomes: Vec<_> = "teh"
            .chars()
            .map(|c| buf.handle_event(KeyEvent::ch(c), &idx, true))
            .collect();
        assert!(matches!(
            &outcomes[2],
            KeyOutcome::Matched(ctx) if ctx.trigger == TriggerClass::Autocorrect
        ));
    }

    #[test]
    fn backspace_trims_one_character() {
        let idx = index(vec![StoredHotstring::new(
            "hello",
            "hi",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);

        type_str(&mut buf, &idx, "hello");
        buf.handle_event(KeyEvent::of(KeyStroke::Backspace), &idx, false);
        buf.handle_event(KeyEvent::of(KeyStroke::Backspace), &idx, false);
        type_str(&mut buf, &idx, "lo");

        // "hello" minus last 2 plus "lo" == "hello" again
        assert_eq!(buf.candidate(), "hello");
        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Space)),
            &idx,
            false,
        );
        assert!(matches!(outcome, KeyOutcome::Matched(_)));
    }

    #[test]
    fn backspace_on_empty_buffer_is_harmless() {
        let idx = index(vec![]);
        let mut buf = MatchBuffer::new(16);
        assert_eq!(
            buf.handle_event(KeyEvent::of(KeyStroke::Backspace), &idx, false),
            KeyOutcome::PassThrough
        );
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn reset_keys_are_idempotent() {
        let idx = index(vec![]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "abc");

        buf.handle_event(KeyEvent::of(KeyStroke::Reset), &idx, false);
        assert_eq!(buf.state(&idx), BufferState::Idle);
        buf.handle_event(KeyEvent::of(KeyStroke::Reset), &idx, false);
        assert_eq!(buf.state(&idx), BufferState::Idle);
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn mouse_click_resets() {
        let idx = index(vec![]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "abc");
        buf.handle_event(KeyEvent::of(KeyStroke::MouseClick), &idx, false);
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn chorded_character_resets_candidate() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "bt");

        let mut mods = Modifiers::NONE;
        mods.ctrl = true;
        buf.handle_event(
            KeyEvent {
                stroke: KeyStroke::Char('w'),
                modifiers: mods,
                window: None,
            },
            &idx,
            false,
        );
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn chorded_trigger_does_not_confirm() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Enter],
        )]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "btw");

        let mut mods = Modifiers::NONE;
        mods.ctrl = true;
        let outcome = buf.handle_event(
            KeyEvent {
                stroke: KeyStroke::Trigger(TriggerKey::Enter),
                modifiers: mods,
                window: None,
            },
            &idx,
            false,
        );
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(buf.candidate(), "");
    }

    #[test]
    fn shift_is_ordinary_typing() {
        let idx = index(vec![StoredHotstring::new(
            "BTW",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);

        let mut mods = Modifiers::NONE;
        mods.shift = true;
        for c in "BTW".chars() {
            buf.handle_event(
                KeyEvent {
                    stroke: KeyStroke::Char(c),
                    modifiers: mods,
                    window: None,
                },
                &idx,
                false,
            );
        }
        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Space)),
            &idx,
            false,
        );
        assert!(matches!(outcome, KeyOutcome::Matched(_)));
    }

    #[test]
    fn candidate_is_case_sensitive() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "BTW");
        let outcome = buf.handle_event(
            KeyEvent::of(KeyStroke::Trigger(TriggerKey::Space)),
            &idx,
            false,
        );
        assert_eq!(outcome, KeyOutcome::PassThrough);
    }

    #[test]
    fn growth_guard_forces_silent_reset() {
        let idx = index(vec![StoredHotstring::new(
            "omw",
            "on my way!",
            &[TriggerClass::Instant],
        )]);
        // Cap = longest (3) + slack (2) = 5.
        let mut buf = MatchBuffer::new(2);

        type_str(&mut buf, &idx, "xxxxx");
        assert_eq!(buf.candidate(), "xxxxx");
        // The sixth character trips the guard.
        buf.handle_event(KeyEvent::ch('x'), &idx, false);
        assert_eq!(buf.candidate(), "");

        // The engine still matches afterwards.
        let outcomes = type_str(&mut buf, &idx, "omw");
        assert!(matches!(outcomes[2], KeyOutcome::Matched(_)));
    }

    #[test]
    fn modifiers_are_captured_at_confirming_keystroke() {
        let idx = index(vec![StoredHotstring::new(
            "btw",
            "by the way",
            &[TriggerClass::Space],
        )]);
        let mut buf = MatchBuffer::new(16);
        type_str(&mut buf, &idx, "btw");

        let mut mods = Modifiers::NONE;
        mods.shift = true;
        let outcome = buf.handle_event(
            KeyEvent {
                stroke: KeyStroke::Trigger(TriggerKey::Space),
                modifiers: mods,
                window: Some("editor".to_string()),
            },
            &idx,
            false,
        );
        match outcome {
            KeyOutcome::Matched(ctx) => {
                assert!(ctx.modifiers.shift);
                assert_eq!(ctx.window.as_deref(), Some("editor"));
            }
            other => panic!("expected match, got {:?}", other),
        }
    }
}

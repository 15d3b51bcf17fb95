use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which key category finalises a hotstring match.
///
/// `Autocorrect` is a trigger-less classification of its own: it is checked
/// before the four standard classes on every accumulation step and is
/// mutually exclusive with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerClass {
    Enter,
    Tab,
    Space,
    Instant,
    Autocorrect,
}

impl fmt::Display for TriggerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerClass::Enter => "enter",
            TriggerClass::Tab => "tab",
            TriggerClass::Space => "space",
            TriggerClass::Instant => "instant",
            TriggerClass::Autocorrect => "autocorrect",
        };
        f.write_str(name)
    }
}

/// How replacement text reaches the active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// Keystroke injection. Preferred: leaves the clipboard alone.
    #[default]
    Direct,
    /// Clipboard round trip (save, set, paste, restore). Favors
    /// compatibility with apps that drop synthetic keystrokes.
    Clipboard,
}

/// A single expansion rule as stored: identity is the *encoded* display
/// text (see [`crate::codec`]), the payload is raw replacement text with
/// an optional script-mode prefix marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHotstring {
    /// Hex-encoded display text, the storage key.
    pub id: String,
    /// Raw replacement payload (may start with the script marker).
    pub replacement: String,
    /// Trigger classes this rule is enrolled in. Either a non-empty subset
    /// of {enter, tab, space, instant} or exactly {autocorrect}.
    pub triggers: BTreeSet<TriggerClass>,
}

impl StoredHotstring {
    pub fn new(display: &str, replacement: impl Into<String>, triggers: &[TriggerClass]) -> Self {
        StoredHotstring {
            id: crate::codec::encode(display),
            replacement: replacement.into(),
            triggers: triggers.iter().copied().collect(),
        }
    }
}

/// A named, independently enabled/disabled collection of hotstrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub hotstrings: Vec<StoredHotstring>,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Bundle {
            name: name.into(),
            enabled: true,
            hotstrings: Vec::new(),
        }
    }
}

/// Engine runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub send_mode: SendMode,
    #[serde(default)]
    pub autocorrect_enabled: bool,
    /// Extra characters the candidate may grow past the longest registered
    /// hotstring before the unbounded-growth guard resets it.
    #[serde(default = "default_candidate_slack")]
    pub candidate_slack: usize,
}

fn default_candidate_slack() -> usize {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            send_mode: SendMode::Direct,
            autocorrect_enabled: false,
            candidate_slack: default_candidate_slack(),
        }
    }
}

/// Expansion statistics, persisted best-effort through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub expanded: u64,
    pub chars_saved: u64,
}

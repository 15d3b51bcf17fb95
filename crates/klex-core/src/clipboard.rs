use arboard::Clipboard;

use crate::error::{KlexError, Result};

/// Clipboard collaborator: template `%c` substitution reads it, the
/// clipboard send mode round-trips through it.
pub trait ClipboardAccess {
    fn get(&mut self) -> Result<String>;
    fn set(&mut self, text: &str) -> Result<()>;
}

/// System clipboard backed by `arboard`. A fresh handle is opened per
/// operation; holding one across threads is not portable.
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> SystemClipboard {
        SystemClipboard
    }

    fn open() -> Result<Clipboard> {
        Clipboard::new().map_err(|e| KlexError::Clipboard(e.to_string()))
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        SystemClipboard::new()
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get(&mut self) -> Result<String> {
        Self::open()?
            .get_text()
            .map_err(|e| KlexError::Clipboard(e.to_string()))
    }

    fn set(&mut self, text: &str) -> Result<()> {
        Self::open()?
            .set_text(text)
            .map_err(|e| KlexError::Clipboard(e.to_string()))
    }
}

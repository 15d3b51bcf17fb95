//! The engine object: owns the match buffer, reads trigger-index
//! snapshots, and drives expansion through the collaborator traits.
//!
//! Owned by a single consumer thread; the only shared state is the
//! [`IndexHandle`], which configuration producers republish wholesale.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, warn};

use crate::actions::{build_actions, ExpansionAction};
use crate::clipboard::ClipboardAccess;
use crate::error::Result;
use crate::index::IndexHandle;
use crate::matcher::{ExpansionContext, KeyEvent, KeyOutcome, MatchBuffer};
use crate::models::EngineConfig;
use crate::template::{expand, PromptSource};

/// How long the clipboard round trip waits for the paste to land before
/// restoring the saved clipboard.
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(150);

/// Output collaborator: the OS-level injection boundary.
pub trait OutputSink {
    fn delete_chars(&mut self, n: usize) -> Result<()>;
    fn emit_text(&mut self, text: &str) -> Result<()>;
    fn move_cursor_left(&mut self, n: usize) -> Result<()>;
    /// Send the platform paste chord; the engine has already set the
    /// clipboard contents.
    fn paste_via_clipboard(&mut self) -> Result<()>;
}

/// Statistics collaborator. Persistence is best-effort: the engine logs
/// and swallows failures, it never rolls back a delivered expansion.
pub trait StatisticsSink {
    fn record_expansion(&mut self, chars_saved: u64) -> Result<()>;
}

/// Statistics sink that drops everything (tests, dry runs).
pub struct NullStats;

impl StatisticsSink for NullStats {
    fn record_expansion(&mut self, _chars_saved: u64) -> Result<()> {
        Ok(())
    }
}

pub struct ExpansionEngine {
    index: Arc<IndexHandle>,
    buffer: MatchBuffer,
    config: EngineConfig,
    clipboard: Box<dyn ClipboardAccess + Send>,
    prompt: Box<dyn PromptSource + Send>,
    output: Box<dyn OutputSink + Send>,
    stats: Box<dyn StatisticsSink + Send>,
    enabled: bool,
}

impl ExpansionEngine {
    pub fn new(
        index: Arc<IndexHandle>,
        config: EngineConfig,
        clipboard: Box<dyn ClipboardAccess + Send>,
        prompt: Box<dyn PromptSource + Send>,
        output: Box<dyn OutputSink + Send>,
        stats: Box<dyn StatisticsSink + Send>,
    ) -> ExpansionEngine {
        let buffer = MatchBuffer::new(config.candidate_slack);
        ExpansionEngine {
            index,
            buffer,
            config,
            clipboard,
            prompt,
            output,
            stats,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling clears the candidate so stale text never matches after a
    /// re-enable.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.buffer.reset();
        }
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Process one key event in arrival order.
    ///
    /// Errors abort only the current expansion: the match buffer has
    /// already reset by the time expansion work starts, so a cancelled
    /// prompt or failed delivery never desyncs future matching.
    pub fn handle_event(&mut self, event: KeyEvent) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let snapshot = self.index.snapshot();
        match self
            .buffer
            .handle_event(event, &snapshot, self.config.autocorrect_enabled)
        {
            KeyOutcome::PassThrough => Ok(()),
            KeyOutcome::Matched(ctx) => self.fire(ctx),
        }
    }

    fn fire(&mut self, ctx: ExpansionContext) -> Result<()> {
        let snapshot = self.index.snapshot();
        let entry = match snapshot.entry(&ctx.encoded) {
            Some(entry) => entry,
            None => {
                // Index republished between match and fire; the rule is gone.
                warn!(typed = %ctx.typed, "matched hotstring vanished from index");
                return Ok(());
            }
        };

        let expanded = expand(
            &entry.replacement,
            self.config.send_mode,
            self.clipboard.as_mut(),
            self.prompt.as_ref(),
            Local::now(),
        )?;

        let actions = build_actions(&ctx, &expanded, self.config.send_mode);
        self.deliver(&actions)?;

        debug!(
            typed = %ctx.typed,
            trigger = %ctx.trigger,
            chars = expanded.chars,
            "expanded hotstring"
        );
        if let Err(err) = self.stats.record_expansion(expanded.chars as u64) {
            warn!(error = %err, "failed to persist expansion statistics");
        }
        Ok(())
    }

    fn deliver(&mut self, actions: &[ExpansionAction]) -> Result<()> {
        for action in actions {
            match action {
                ExpansionAction::DeleteChars(n) => self.output.delete_chars(*n)?,
                ExpansionAction::EmitText(text) => self.output.emit_text(text)?,
                ExpansionAction::MoveCursorLeft(n) => self.output.move_cursor_left(*n)?,
                ExpansionAction::PasteViaClipboard(text) => self.paste_round_trip(text)?,
            }
        }
        Ok(())
    }

    /// Save the user's clipboard, paste the replacement through it, then
    /// restore after a bounded wait.
    fn paste_round_trip(&mut self, text: &str) -> Result<()> {
        let saved = self.clipboard.get().ok();
        self.clipboard.set(text)?;
        self.output.paste_via_clipboard()?;
        thread::sleep(CLIPBOARD_SETTLE);
        if let Some(saved) = saved {
            if let Err(err) = self.clipboard.set(&saved) {
                warn!(error = %err, "failed to restore clipboard after paste");
            }
        }
        Ok(())
    }
}

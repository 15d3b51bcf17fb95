//! Expansion action builder: turns an expanded template into the concrete
//! ordered action list handed to the output sink.

use crate::matcher::ExpansionContext;
use crate::models::SendMode;
use crate::template::ExpandedTemplate;

/// One concrete step for the output collaborator, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionAction {
    /// Erase this many characters (what the user typed, never the
    /// replacement).
    DeleteChars(usize),
    /// Inject literal text as keystrokes.
    EmitText(String),
    /// Deliver the text through a clipboard round trip: save the current
    /// clipboard, set it to this text, paste, restore after a bounded wait.
    PasteViaClipboard(String),
    /// Cursor-left presses honouring an embedded `%|` marker.
    MoveCursorLeft(usize),
}

/// Build the action list for one confirmed expansion.
///
/// The delete count is the character length of the originally typed
/// candidate; the confirming trigger key was never consumed, so it is not
/// erased or re-emitted here.
pub fn build_actions(
    ctx: &ExpansionContext,
    expanded: &ExpandedTemplate,
    send_mode: SendMode,
) -> Vec<ExpansionAction> {
    let mut actions = Vec::with_capacity(3);
    actions.push(ExpansionAction::DeleteChars(ctx.typed.chars().count()));

    // Script payloads always go through keystroke injection; pasting a
    // script body would bypass apps that treat paste specially.
    if send_mode == SendMode::Clipboard && !expanded.script {
        actions.push(ExpansionAction::PasteViaClipboard(expanded.text.clone()));
    } else {
        actions.push(ExpansionAction::EmitText(expanded.text.clone()));
    }

    if expanded.return_to > 0 {
        actions.push(ExpansionAction::MoveCursorLeft(expanded.return_to));
    }
    actions
}

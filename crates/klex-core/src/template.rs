//! Template expander: script-mode detection, variable token substitution,
//! prompt resolution and cursor-placement offset.
//!
//! Tokens, resolved at expansion time:
//!
//! * `%c`  : current clipboard contents
//! * `%t`  : short time   (e.g. "2:30 PM")
//! * `%ds` : short date   (e.g. "1/29/2026")
//! * `%dl` : long date    (e.g. "January 29, 2026")
//! * `%tl` : long time
//! * `%p`  : user prompt (blocking; cancel aborts the expansion)
//! * `%|`  : cursor position marker
//!
//! Substitution is a single left-to-right scan, longest token first at
//! each position, so `%tl` is never clipped to `%t` and no substituted
//! value is ever re-scanned for further tokens.

use chrono::{DateTime, Local};
use tracing::warn;

use crate::clipboard::ClipboardAccess;
use crate::error::{KlexError, Result};
use crate::models::SendMode;

/// Payload prefix that flags a script-mode hotstring.
pub const SCRIPT_MARKER: &str = "::scr::";

/// Cursor-placement marker.
pub const CURSOR_TOKEN: &str = "%|";

/// Prompt collaborator for `%p`: synchronous from the engine's point of
/// view. Returns `None` when the user cancelled.
pub trait PromptSource {
    fn request_text(&self, template: &str) -> Option<String>;
}

/// Prompt source for headless runs: every `%p` resolves to empty text.
pub struct SilentPrompt;

impl PromptSource for SilentPrompt {
    fn request_text(&self, _template: &str) -> Option<String> {
        Some(String::new())
    }
}

/// Fully expanded replacement, ready for the action builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedTemplate {
    /// Final literal text to emit.
    pub text: String,
    /// Cursor-left movements to apply after emission (0 when no `%|`).
    pub return_to: usize,
    /// Character count of the final text, for statistics.
    pub chars: usize,
    /// Whether the payload carried the script marker.
    pub script: bool,
}

/// Expand a raw replacement payload.
///
/// Script-mode payloads (marker prefix) skip all variable substitution
/// except the prompt; everything after the marker is emitted literally.
pub fn expand(
    payload: &str,
    send_mode: SendMode,
    clipboard: &mut dyn ClipboardAccess,
    prompt: &dyn PromptSource,
    now: DateTime<Local>,
) -> Result<ExpandedTemplate> {
    if let Some(rest) = payload.strip_prefix(SCRIPT_MARKER) {
        let mut text = rest.replace("\r\n", "\n");
        if text.contains("%p") {
            let value = prompt
                .request_text(&text)
                .ok_or(KlexError::ExpansionCancelled)?;
            text = text.replace("%p", &value);
        }
        return Ok(ExpandedTemplate {
            chars: text.chars().count(),
            text,
            return_to: 0,
            script: true,
        });
    }

    let mut text = payload.to_string();
    // The keystroke-send path types '\n' itself; the clipboard path pastes
    // the payload byte-for-byte.
    if send_mode == SendMode::Direct {
        text = text.replace("\r\n", "\n");
    }

    // Prompt before substitution: the user sees the raw template.
    let prompt_value = if text.contains("%p") {
        Some(
            prompt
                .request_text(&text)
                .ok_or(KlexError::ExpansionCancelled)?,
        )
    } else {
        None
    };

    let mut text = substitute(&text, clipboard, prompt_value.as_deref(), now);

    // Cursor offset is computed within the fully substituted text.
    let return_to = match text.find(CURSOR_TOKEN) {
        Some(byte_pos) => {
            let offset = text[..byte_pos].chars().count();
            text = text.replace(CURSOR_TOKEN, "");
            text.chars().count() - offset
        }
        None => 0,
    };

    Ok(ExpandedTemplate {
        chars: text.chars().count(),
        text,
        return_to,
        script: false,
    })
}

/// One-pass token substitution. The cursor token is copied through
/// verbatim; [`expand`] strips it after measuring the offset.
fn substitute(
    text: &str,
    clipboard: &mut dyn ClipboardAccess,
    prompt_value: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut clip: Option<String> = None;
    let mut rest = text;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        // Longest tokens first: %tl/%dl/%ds before %t.
        if let Some(after) = tail.strip_prefix("%tl") {
            out.push_str(&now.format("%H:%M:%S %p").to_string());
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%dl") {
            out.push_str(&now.format("%B %-d, %Y").to_string());
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%ds") {
            out.push_str(&now.format("%-m/%-d/%Y").to_string());
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%t") {
            out.push_str(&now.format("%-I:%M %p").to_string());
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%c") {
            let value = clip.get_or_insert_with(|| match clipboard.get() {
                Ok(v) => v,
                Err(err) => {
                    warn!(error = %err, "clipboard read failed, substituting empty text");
                    String::new()
                }
            });
            out.push_str(value);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%p") {
            out.push_str(prompt_value.unwrap_or(""));
            rest = after;
        } else {
            // Unknown token (including %|): copy the '%' and move on.
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FakeClipboard(String);

    impl ClipboardAccess for FakeClipboard {
        fn get(&mut self) -> Result<String> {
            Ok(self.0.clone())
        }

        fn set(&mut self, text: &str) -> Result<()> {
            self.0 = text.to_string();
            Ok(())
        }
    }

    struct FakePrompt(Option<String>);

    impl PromptSource for FakePrompt {
        fn request_text(&self, _template: &str) -> Option<String> {
            self.0.clone()
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 29, h, m, s).unwrap()
    }

    fn expand_direct(payload: &str, clip: &str, prompt: Option<&str>) -> Result<ExpandedTemplate> {
        let mut clipboard = FakeClipboard(clip.to_string());
        let prompt = FakePrompt(prompt.map(str::to_string));
        expand(
            payload,
            SendMode::Direct,
            &mut clipboard,
            &prompt,
            at(14, 30, 45),
        )
    }

    #[test]
    fn plain_text_passes_through() {
        let out = expand_direct("by the way", "", None).unwrap();
        assert_eq!(out.text, "by the way");
        assert_eq!(out.return_to, 0);
        assert_eq!(out.chars, 10);
        assert!(!out.script);
    }

    #[test]
    fn date_and_time_tokens() {
        let out = expand_direct("%t | %ds | %dl | %tl", "", None).unwrap();
        assert_eq!(out.text, "2:30 PM | 1/29/2026 | January 29, 2026 | 14:30:45 PM");
    }

    #[test]
    fn long_time_token_is_not_clipped_to_short_time() {
        // %tl must not be parsed as %t followed by a literal 'l'.
        let out = expand_direct("%tl", "", None).unwrap();
        assert_eq!(out.text, "14:30:45 PM");
    }

    #[test]
    fn clipboard_token() {
        let out = expand_direct("see: %c", "pasted", None).unwrap();
        assert_eq!(out.text, "see: pasted");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        // A clipboard holding token text must come out literally.
        let out = expand_direct("%c!", "%ds %t %p", None).unwrap();
        assert_eq!(out.text, "%ds %t %p!");
    }

    #[test]
    fn unknown_percent_sequences_stay_literal() {
        let out = expand_direct("50%x and 10%", "", None).unwrap();
        assert_eq!(out.text, "50%x and 10%");
    }

    #[test]
    fn cursor_placement_after_prompt() {
        let out = expand_direct("Dear %p,\n\n%|Sincerely", "", Some("Sam")).unwrap();
        assert_eq!(out.text, "Dear Sam,\n\nSincerely");
        assert_eq!(out.return_to, "Sincerely".chars().count());
        assert_eq!(out.chars, out.text.chars().count());
    }

    #[test]
    fn cancelled_prompt_aborts_expansion() {
        let err = expand_direct("Dear %p", "", None).unwrap_err();
        assert!(matches!(err, KlexError::ExpansionCancelled));
    }

    #[test]
    fn script_mode_skips_substitution() {
        let out = expand_direct("::scr::%t literal", "", None).unwrap();
        assert!(out.script);
        assert_eq!(out.text, "%t literal");
        assert_eq!(out.return_to, 0);
    }

    #[test]
    fn script_mode_still_resolves_prompt() {
        let out = expand_direct("::scr::run %p now", "", Some("fast")).unwrap();
        assert_eq!(out.text, "run fast now");
    }

    #[test]
    fn script_mode_cancelled_prompt_aborts() {
        let err = expand_direct("::scr::run %p now", "", None).unwrap_err();
        assert!(matches!(err, KlexError::ExpansionCancelled));
    }

    #[test]
    fn direct_mode_normalises_crlf() {
        let out = expand_direct("a\r\nb", "", None).unwrap();
        assert_eq!(out.text, "a\nb");
    }

    #[test]
    fn clipboard_mode_keeps_crlf() {
        let mut clipboard = FakeClipboard(String::new());
        let out = expand(
            "a\r\nb",
            SendMode::Clipboard,
            &mut clipboard,
            &FakePrompt(None),
            at(14, 30, 45),
        )
        .unwrap();
        assert_eq!(out.text, "a\r\nb");
    }

    #[test]
    fn clipboard_read_failure_substitutes_empty() {
        struct BrokenClipboard;
        impl ClipboardAccess for BrokenClipboard {
            fn get(&mut self) -> Result<String> {
                Err(KlexError::Clipboard("no display".to_string()))
            }
            fn set(&mut self, _text: &str) -> Result<()> {
                Ok(())
            }
        }
        let out = expand(
            "[%c]",
            SendMode::Direct,
            &mut BrokenClipboard,
            &FakePrompt(None),
            at(14, 30, 45),
        )
        .unwrap();
        assert_eq!(out.text, "[]");
    }
}

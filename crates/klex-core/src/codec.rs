//! Reversible mapping between a hotstring's display text and a key-safe
//! identifier: four uppercase hex digits per UTF-16 code unit, big-endian.
//!
//! Stored hotstrings are keyed by this encoding, so arbitrary display text
//! (including `:`, `/` and whitespace) stays safe to use as a map key or
//! filename.

use crate::error::{KlexError, Result};

/// Encode display text to its hex identifier. Never fails.
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 4);
    for unit in text.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out
}

/// Decode a hex identifier back to display text.
///
/// Fails with [`KlexError::MalformedIdentifier`] when the identifier's
/// length is not a multiple of four, contains non-hex digits, or decodes
/// to invalid UTF-16 (an unpaired surrogate).
pub fn decode(id: &str) -> Result<String> {
    if id.len() % 4 != 0 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(KlexError::MalformedIdentifier(id.to_string()));
    }

    let mut units = Vec::with_capacity(id.len() / 4);
    for chunk in id.as_bytes().chunks(4) {
        // Chunks of an ASCII hex string are valid UTF-8.
        let s = std::str::from_utf8(chunk)
            .map_err(|_| KlexError::MalformedIdentifier(id.to_string()))?;
        let unit = u16::from_str_radix(s, 16)
            .map_err(|_| KlexError::MalformedIdentifier(id.to_string()))?;
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| KlexError::MalformedIdentifier(id.to_string()))
}

use sha1::{Digest, Sha1};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize label / attribute text for matching.
///
/// NFKC, NBSP and ideographic space folded to ASCII space, zero-width
/// characters removed, trimmed, lower-cased. Idempotent.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let folded: String = raw
        .nfkc()
        .filter(|c| !is_zero_width(*c))
        .map(|c| match c {
            '\u{00A0}' | '\u{3000}' => ' ',
            other => other,
        })
        .collect();

    let lowered = folded.trim().to_lowercase();
    // Lower-casing can produce sequences that NFKC would rewrite again
    // (e.g. some compatibility ligatures), so settle once more.
    if lowered.nfkc().eq(lowered.chars()) {
        lowered
    } else {
        lowered.nfkc().collect::<String>().trim().to_string()
    }
}

/// Normalize, then collapse internal whitespace runs to one space.
pub fn normalize_compact(raw: &str) -> String {
    collapse_whitespace(&normalize(raw))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}')
}

/// Truncate to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ============================================================================
// CSS selector helpers
// ============================================================================

/// Serialize a CSS identifier (for `#id` selectors), after CSSOM `CSS.escape`.
pub fn css_escape_ident(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, ch) in raw.chars().enumerate() {
        let code = ch as u32;
        if code == 0 {
            out.push('\u{FFFD}');
        } else if code < 0x20 || code == 0x7F {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && ch.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && ch == '-' && raw.chars().count() == 1 {
            out.push_str("\\-");
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || code >= 0x80 {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Quote a value for use inside `[attr="..."]`.
pub fn css_quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            '\r' => out.push_str("\\d "),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Stable hex digest, used to fingerprint a loaded lexicon.
pub fn text_fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

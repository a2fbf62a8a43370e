use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon::LogicalFieldKey;
use crate::text::normalize::{collapse_whitespace, truncate_chars};

/// Maximum characters kept in a personal-name value.
pub const NAME_MAX_CHARS: usize = 64;

const MOBILE_PREFIXES: [&str; 3] = ["070", "080", "090"];
const NAME_SEPARATORS: [char; 5] = [' ', '\u{3000}', '・', '、', ','];

static PHONE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9+()\-\s]").unwrap());

/// Strip line breaks, collapse whitespace, cap at [`NAME_MAX_CHARS`].
pub fn sanitize_name(value: &str) -> String {
    let flat = value.replace(['\r', '\n'], " ");
    truncate_chars(&collapse_whitespace(&flat), NAME_MAX_CHARS)
}

/// Trim, repair full-width `＠` `．` `：`, lower-case.
pub fn sanitize_email(value: &str) -> String {
    value
        .trim()
        .replace('＠', "@")
        .replace('．', ".")
        .replace('：', ":")
        .to_lowercase()
}

/// Full-width digits to ASCII, dash variants to `-`, keep only digits,
/// `+`, `()`, `-` and single spaces.
pub fn sanitize_phone(value: &str) -> String {
    let mapped: String = value
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10).unwrap_or(c),
            'ー' | '―' | '−' | '－' => '-',
            '＋' => '+',
            other => other,
        })
        .collect();
    let kept = PHONE_DISALLOWED.replace_all(&mapped, "");
    collapse_whitespace(&kept)
}

/// Shape a raw applicant value for the widget class of `key`.
pub fn sanitize_for_key(key: LogicalFieldKey, value: &str) -> String {
    if key.is_name_like() || key.is_kana() {
        sanitize_name(value)
    } else if key.is_email_like() {
        sanitize_email(value)
    } else if key.is_phone_like() {
        sanitize_phone(value)
    } else {
        value.trim().to_string()
    }
}

/// Split a Japanese phone number into three groups.
///
/// `+81` becomes a leading `0`. 11-digit mobile numbers split 3-4-4,
/// 10-digit numbers 2-4-4, anything from 6 digits up best-effort.
pub fn split_phone(raw: &str) -> (String, String, String) {
    let raw = raw.trim();
    let all_digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = if raw.starts_with("+81") {
        format!("0{}", all_digits.get(2..).unwrap_or(""))
    } else {
        all_digits
    };

    let cut = |a: usize, b: usize| {
        (
            digits[..a].to_string(),
            digits[a..b].to_string(),
            digits[b..].to_string(),
        )
    };

    let len = digits.len();
    if len == 11 && MOBILE_PREFIXES.iter().any(|p| digits.starts_with(p)) {
        return cut(3, 7);
    }
    if len == 10 {
        return cut(2, 6);
    }
    if len >= 6 {
        let first = if len >= 7 { 3 } else { 2 };
        let rest = len - first;
        return cut(first, first + rest / 2);
    }
    (digits, String::new(), String::new())
}

/// Split a full name at the first recognized separator.
///
/// With no separator the whole string is the surname.
pub fn split_name(full: &str) -> (String, String) {
    let s = full.replace('\u{3000}', " ");
    let s = s.trim();
    if s.is_empty() {
        return (String::new(), String::new());
    }
    for sep in NAME_SEPARATORS {
        let parts: Vec<&str> = s.split(sep).filter(|p| !p.is_empty()).collect();
        if parts.len() >= 2 {
            let given = parts[1..].join(&sep.to_string());
            return (parts[0].trim().to_string(), given.trim().to_string());
        }
    }
    (s.to_string(), String::new())
}

use std::fmt;
use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::LogicalFieldKey;
use crate::sanitize::values::NAME_MAX_CHARS;

static MESSAGE_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(お問い合わせ|ご相談|自由記入|メッセージ|詳細|内容)").unwrap());

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+",
        r"@",
        r"[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?",
        r"(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    ))
    .unwrap()
});

static TWO_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{2,}").unwrap());

/// Why a (key, element, value) triple was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum RejectReason {
    NameLooksLikeTextarea,
    NameTooLongOrHasNewlines,
    NamePlaceholderSmellsLikeMessage,
    EmailFormatInvalid,
    PhoneDigitsTooFew,
    PhonePartShapeInvalid,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::NameLooksLikeTextarea => "name-looks-like-textarea",
            RejectReason::NameTooLongOrHasNewlines => "name-too-long-or-has-newlines",
            RejectReason::NamePlaceholderSmellsLikeMessage => "name-placeholder-smells-like-message",
            RejectReason::EmailFormatInvalid => "email-format-invalid",
            RejectReason::PhoneDigitsTooFew => "phone-digits-too-few",
            RejectReason::PhonePartShapeInvalid => "phone-part-shape-invalid",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RejectReason> for String {
    fn from(reason: RejectReason) -> Self {
        reason.as_str().to_string()
    }
}

/// Outcome of the preflight gate. Advisory: a refusal means "try the next
/// candidate or skip this key", never "abort the task".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreflightVerdict {
    pub ok: bool,
    pub reasons: Vec<RejectReason>,
}

impl PreflightVerdict {
    fn pass() -> Self {
        Self {
            ok: true,
            reasons: Vec::new(),
        }
    }

    fn reject(reason: RejectReason) -> Self {
        Self {
            ok: false,
            reasons: vec![reason],
        }
    }
}

/// Widget facts the gate looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct WidgetShape<'a> {
    pub tag: &'a str,
    pub input_type: &'a str,
    pub placeholder: &'a str,
    pub aria_label: &'a str,
}

impl<'a> From<&'a FieldDescriptor> for WidgetShape<'a> {
    fn from(d: &'a FieldDescriptor) -> Self {
        WidgetShape {
            tag: &d.tag,
            input_type: &d.input_type,
            placeholder: &d.placeholder,
            aria_label: &d.aria_label,
        }
    }
}

/// Last-chance admissibility check before `value` is committed to a widget.
pub fn preflight_check(key: LogicalFieldKey, widget: WidgetShape<'_>, value: &str) -> PreflightVerdict {
    if key.is_name_like() {
        if widget.tag.eq_ignore_ascii_case("textarea") {
            return PreflightVerdict::reject(RejectReason::NameLooksLikeTextarea);
        }
        if value.chars().count() > NAME_MAX_CHARS || value.contains(['\n', '\r']) {
            return PreflightVerdict::reject(RejectReason::NameTooLongOrHasNewlines);
        }
        if MESSAGE_HINT.is_match(widget.placeholder) || MESSAGE_HINT.is_match(widget.aria_label) {
            return PreflightVerdict::reject(RejectReason::NamePlaceholderSmellsLikeMessage);
        }
    }

    if key.is_email_like() && !is_valid_email(value) {
        return PreflightVerdict::reject(RejectReason::EmailFormatInvalid);
    }

    if key == LogicalFieldKey::Phone && !TWO_DIGITS.is_match(value) {
        return PreflightVerdict::reject(RejectReason::PhoneDigitsTooFew);
    }

    if let Some(lengths) = phone_part_lengths(key) {
        let digits_only = value.chars().all(|c| c.is_ascii_digit());
        if !digits_only || !lengths.contains(&value.chars().count()) {
            return PreflightVerdict::reject(RejectReason::PhonePartShapeInvalid);
        }
    }

    PreflightVerdict::pass()
}

/// Digit counts a split phone box accepts: area code, exchange, subscriber.
fn phone_part_lengths(key: LogicalFieldKey) -> Option<RangeInclusive<usize>> {
    match key {
        LogicalFieldKey::Phone1 => Some(2..=5),
        LogicalFieldKey::Phone2 => Some(1..=4),
        LogicalFieldKey::Phone3 => Some(2..=4),
        _ => None,
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_FORMAT.is_match(value)
}

/// Whether name-adjacent text reads like a free-text message prompt.
pub fn smells_like_message(text: &str) -> bool {
    MESSAGE_HINT.is_match(text)
}

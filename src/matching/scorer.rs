use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::{Lexicon, LogicalFieldKey};
use crate::text::normalize;

// ============================================================================
// Tunables
// ============================================================================

/// Empirically tuned acceptance limits. Named and overridable from the
/// `scoring` config section; not derived from anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub default_floor: f64,
    pub name_floor: f64,
    pub email_floor: f64,
    pub inquiry_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_floor: 3.0,
            name_floor: 4.0,
            email_floor: 4.0,
            inquiry_threshold: 1.2,
        }
    }
}

impl ScoringConfig {
    /// Minimum score below which `key` is left unassigned.
    pub fn floor_for(&self, key: LogicalFieldKey) -> f64 {
        if key.is_name_like() {
            self.name_floor
        } else if key.is_email_like() {
            self.email_floor
        } else {
            self.default_floor
        }
    }
}

const STRONG_BONUS: f64 = 4.0;
const MAX_SPECIFICITY_CHARS: usize = 6;
const AUTOCOMPLETE_HIT: f64 = 8.0;
const AUTOCOMPLETE_MISS: f64 = -4.0;
const TYPE_AFFINITY: f64 = 4.0;
const LABEL_MENTION: f64 = 2.0;
const CONFIRM_BONUS: f64 = 6.0;
const NEGATIVE_TOKEN: f64 = -10.0;
const TEXTAREA_ON_SHORT_KEY: f64 = -12.0;
const SHAPE_MISMATCH: f64 = -8.0;

static NAME_MESSAGE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(お問い合わせ|ご相談|自由記入|メッセージ|詳細|内容|備考|本文|comment|message|free[-_ ]?text)").unwrap()
});
static URLISH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://|www\.").unwrap());

const EXCLUDED_INPUT_TYPES: [&str; 9] = [
    "hidden", "submit", "button", "reset", "image", "file", "checkbox", "radio", "search",
];

// ============================================================================
// Scorer
// ============================================================================

/// Scores (key, descriptor) pairs against the lexicon plus structural
/// heuristics. Pure; one per matching pass.
pub struct FieldScorer<'a> {
    lexicon: &'a Lexicon,
}

/// Per-source normalized text, computed once per descriptor.
struct Sources {
    name: String,
    id: String,
    label: String,
    aria: String,
    placeholder: String,
    class: String,
    all: String,
}

impl Sources {
    fn of(d: &FieldDescriptor, lexicon: &Lexicon) -> Self {
        Sources {
            name: normalize(&d.name),
            id: normalize(&d.id),
            label: lexicon.strip_stopwords(&normalize(&d.label_text)),
            aria: normalize(&d.aria_label),
            placeholder: normalize(&d.placeholder),
            class: normalize(&d.class),
            all: d.attr_text(),
        }
    }

    fn weighted(&self) -> [(&str, f64); 6] {
        [
            (self.name.as_str(), 3.0),
            (self.id.as_str(), 3.0),
            (self.label.as_str(), 3.0),
            (self.aria.as_str(), 2.0),
            (self.placeholder.as_str(), 2.0),
            (self.class.as_str(), 1.0),
        ]
    }

    fn strong_targets(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.id.as_str(),
            self.label.as_str(),
            self.aria.as_str(),
        ]
    }
}

impl<'a> FieldScorer<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Whether `d` may be considered for any key at all.
    pub fn is_candidate(&self, d: &FieldDescriptor) -> bool {
        if !d.visible || d.disabled || !d.is_locatable() {
            return false;
        }
        match d.tag.as_str() {
            "textarea" | "select" => {}
            "input" => {
                if EXCLUDED_INPUT_TYPES.contains(&d.input_type.as_str()) {
                    return false;
                }
            }
            _ => return false,
        }
        !self.is_search_box(d) && !self.is_honeypot(d)
    }

    pub fn is_search_box(&self, d: &FieldDescriptor) -> bool {
        d.input_type == "search"
            || d.role.eq_ignore_ascii_case("searchbox")
            || self.lexicon.search_tokens.exact(&normalize(&d.name))
            || self.lexicon.search_tokens.exact(&normalize(&d.id))
    }

    /// Collapsed or off-screen while carrying a trap-style identifier.
    pub fn is_honeypot(&self, d: &FieldDescriptor) -> bool {
        if !d.is_collapsed() {
            return false;
        }
        let ident = normalize(&format!("{} {} {}", d.name, d.id, d.class));
        self.lexicon.honeypot_tokens.any_in(&ident)
    }

    pub fn is_confirm_tagged(&self, d: &FieldDescriptor) -> bool {
        self.lexicon.is_confirm_tagged(&d.attr_text())
    }

    /// Score of `d` for `key`, or `None` when the pair is ineligible or
    /// carries no recognizing signal. `tentative` is the value that would
    /// be written.
    pub fn score(&self, key: LogicalFieldKey, d: &FieldDescriptor, tentative: &str) -> Option<f64> {
        if !self.is_candidate(d) {
            return None;
        }
        if d.is_select() && !key.accepts_select() {
            return None;
        }
        let src = Sources::of(d, self.lexicon);
        let confirm_tagged = self.lexicon.is_confirm_tagged(&src.all);

        if key.confirm_variant().is_some() && confirm_tagged {
            return None;
        }

        if let Some(base) = key.confirm_base() {
            let own = self.raw_score(key, d, &src, tentative);
            if !confirm_tagged {
                return own;
            }
            let borrowed = self.raw_score(base, d, &src, tentative);
            let best = match (own, borrowed) {
                (Some(a), Some(b)) => a.max(b),
                (a, b) => a.or(b)?,
            };
            return Some(best + CONFIRM_BONUS);
        }

        self.raw_score(key, d, &src, tentative)
    }

    fn raw_score(&self, key: LogicalFieldKey, d: &FieldDescriptor, src: &Sources, tentative: &str) -> Option<f64> {
        let lex = self.lexicon;
        let mut score = 0.0;
        let mut signal = false;

        if let Some(candidates) = lex.candidates(key) {
            let mut best_len = 0;
            for (text, weight) in src.weighted() {
                if let Some(len) = candidates.best_match_len(text) {
                    score += weight;
                    best_len = best_len.max(len);
                    signal = true;
                }
            }
            score += best_len.min(MAX_SPECIFICITY_CHARS) as f64 / 2.0;
        }

        if let Some(strong) = lex.strong(key) {
            if src.strong_targets().iter().any(|t| strong.is_match(t)) {
                score += STRONG_BONUS;
            }
        }

        match lex.autocomplete_key(&d.autocomplete) {
            Some(hinted) if hinted == key => {
                score += AUTOCOMPLETE_HIT;
                signal = true;
            }
            Some(_) => score += AUTOCOMPLETE_MISS,
            None => {}
        }

        if self.type_affinity(key, d) {
            score += TYPE_AFFINITY;
            if key.confirm_base().is_none() && matches!(d.input_type.as_str(), "email" | "tel" | "url") {
                signal = true;
            }
        }

        if !signal {
            return None;
        }

        if lex.negative(key).is_some_and(|neg| neg.is_match(&src.all)) {
            score += NEGATIVE_TOKEN;
        }
        if d.is_textarea() && !key.is_long_text() {
            score += TEXTAREA_ON_SHORT_KEY;
        }

        if key.is_name_like() {
            score += name_like_penalty(d, tentative);
        } else {
            let ty = d.input_type.as_str();
            if (ty == "email" && !key.is_email_like()) || (ty == "url" && key != LogicalFieldKey::Website) {
                score += SHAPE_MISMATCH;
            }
        }

        if lex.label_mentions(key, &src.label) {
            score += LABEL_MENTION;
        }

        Some(score)
    }

    fn type_affinity(&self, key: LogicalFieldKey, d: &FieldDescriptor) -> bool {
        use LogicalFieldKey::*;
        match d.tag.as_str() {
            "textarea" => key == Message,
            "select" => key.accepts_select(),
            _ => match d.input_type.as_str() {
                "email" => key.is_email_like(),
                "tel" => key.is_phone_like(),
                "url" => key == Website,
                _ => false,
            },
        }
    }
}

/// Penalty for steering a personal-name key into a widget that looks like
/// free text, a URL, or an email box.
pub fn name_like_penalty(d: &FieldDescriptor, tentative: &str) -> f64 {
    let mut penalty = 0.0;
    if NAME_MESSAGE_HINT.is_match(&d.placeholder) || NAME_MESSAGE_HINT.is_match(&d.aria_label) {
        penalty -= 6.0;
    }
    if tentative.chars().count() > 80 {
        penalty -= 4.0;
    }
    if tentative.contains(['\n', '\r']) {
        penalty -= 4.0;
    }
    if URLISH.is_match(tentative) {
        penalty -= 6.0;
    }
    if matches!(d.input_type.as_str(), "email" | "url") {
        penalty += SHAPE_MISMATCH;
    }
    penalty
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::{Lexicon, LogicalFieldKey};
use crate::matching::applicant::{ApplicantData, FieldValues};
use crate::matching::scorer::{FieldScorer, ScoringConfig};
use crate::sanitize::preflight::{RejectReason, WidgetShape, preflight_check};

/// Score recorded for phone groups found by the stem pre-pass.
const PHONE_GROUP_SCORE: f64 = 10.0;

static PHONE_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)[-_\[]?([0-3])\]?$").unwrap());
static MESSAGE_TEXTAREA_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)message|inquiry|detail|お問い合わせ|内容").unwrap());

/// Where a logical key landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldTarget {
    pub frame_index: usize,
    pub frame_url: String,
    pub selector: String,
    pub tag: String,
    pub input_type: String,
    pub score: f64,
}

impl FieldTarget {
    fn of(d: &FieldDescriptor, score: f64) -> Self {
        FieldTarget {
            frame_index: d.frame_index,
            frame_url: d.frame_url.clone(),
            selector: d.selector.clone(),
            tag: d.tag.clone(),
            input_type: d.input_type.clone(),
            score,
        }
    }

    pub fn is_select(&self) -> bool {
        self.tag == "select"
    }
}

pub type AssignmentMap = BTreeMap<LogicalFieldKey, FieldTarget>;

/// A candidate pair the preflight gate refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub key: LogicalFieldKey,
    pub selector: String,
    pub reasons: Vec<RejectReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub assignments: AssignmentMap,
    /// Requested keys with no element, in priority order.
    pub unmapped: Vec<LogicalFieldKey>,
    pub rejections: Vec<Rejection>,
}

impl MatchOutcome {
    pub fn unmapped_names(&self) -> Vec<String> {
        self.unmapped.iter().map(|k| k.as_str()).collect()
    }
}

/// Map applicant data onto extracted fields.
pub fn match_fields(
    fields: &[FieldDescriptor],
    data: &ApplicantData,
    lexicon: &Lexicon,
    config: &ScoringConfig,
) -> MatchOutcome {
    match_field_values(fields, &data.field_values(), lexicon, config)
}

/// One assignment pass. Every element is claimed by at most one key.
pub fn match_field_values(
    fields: &[FieldDescriptor],
    values: &FieldValues,
    lexicon: &Lexicon,
    config: &ScoringConfig,
) -> MatchOutcome {
    let mut pass = AssignmentPass {
        fields,
        values,
        scorer: FieldScorer::new(lexicon),
        config,
        claimed: HashSet::new(),
        outcome: MatchOutcome::default(),
    };

    pass.assign_phone_groups();

    use LogicalFieldKey::*;
    let split_parts: [(LogicalFieldKey, &[LogicalFieldKey]); 3] = [
        (Name, &[LastName, FirstName]),
        (Furigana, &[KanaSei, KanaMei]),
        (Phone, &[Phone1, Phone2, Phone3]),
    ];
    let is_split_part = |key: LogicalFieldKey| {
        values.derived.contains(&key) && split_parts.iter().any(|(_, parts)| parts.contains(&key))
    };

    let whole: Vec<LogicalFieldKey> = values
        .keys()
        .filter(|k| !is_split_part(*k))
        .filter(|k| !(*k == Phone && pass.has_all(&[Phone1, Phone2, Phone3])))
        .collect();
    pass.assign_greedy(&whole);

    // Derived split values only go where the whole value found no home.
    let parts: Vec<LogicalFieldKey> = split_parts
        .iter()
        .filter(|(base, _)| !pass.outcome.assignments.contains_key(base))
        .flat_map(|(_, parts)| parts.iter().copied())
        .filter(|k| is_split_part(*k))
        .collect();
    pass.assign_greedy(&parts);

    pass.message_textarea_fallback();

    let assigned = &pass.outcome.assignments;
    let mut unmapped: Vec<LogicalFieldKey> = values
        .requested
        .iter()
        .copied()
        .filter(|key| {
            if assigned.contains_key(key) {
                return false;
            }
            !split_parts
                .iter()
                .any(|(base, parts)| base == key && parts.iter().all(|p| assigned.contains_key(p)))
        })
        .collect();
    unmapped.sort_by_key(|k| k.priority());
    pass.outcome.unmapped = unmapped;

    debug!(
        assigned = pass.outcome.assignments.len(),
        unmapped = pass.outcome.unmapped.len(),
        rejected = pass.outcome.rejections.len(),
        "assignment pass complete"
    );
    pass.outcome
}

struct Candidate {
    key: LogicalFieldKey,
    index: usize,
    score: f64,
    required: bool,
}

struct AssignmentPass<'a> {
    fields: &'a [FieldDescriptor],
    values: &'a FieldValues,
    scorer: FieldScorer<'a>,
    config: &'a ScoringConfig,
    claimed: HashSet<(usize, String)>,
    outcome: MatchOutcome,
}

impl<'a> AssignmentPass<'a> {
    fn is_claimed(&self, d: &FieldDescriptor) -> bool {
        self.claimed.contains(&(d.frame_index, d.selector.clone()))
    }

    fn claim(&mut self, key: LogicalFieldKey, d: &FieldDescriptor, score: f64) {
        self.claimed.insert((d.frame_index, d.selector.clone()));
        debug!(key = %key, selector = %d.selector, score, "field assigned");
        self.outcome.assignments.insert(key, FieldTarget::of(d, score));
    }

    fn has_all(&self, keys: &[LogicalFieldKey]) -> bool {
        keys.iter().all(|k| self.outcome.assignments.contains_key(k))
    }

    /// Three phone-like inputs sharing a name stem and numbered 1-2-3
    /// (or 0-1-2) become `phone1..3`.
    fn assign_phone_groups(&mut self) {
        use LogicalFieldKey::{Phone, Phone1, Phone2, Phone3};
        if ![Phone1, Phone2, Phone3].iter().all(|k| self.values.contains(*k)) {
            return;
        }

        let mut groups: HashMap<(usize, String), Vec<(u32, usize)>> = HashMap::new();
        for (index, d) in self.fields.iter().enumerate() {
            if !self.scorer.is_candidate(d) || d.is_textarea() || d.is_select() {
                continue;
            }
            let Some(caps) = PHONE_PART.captures(&d.name) else {
                continue;
            };
            let phone_like = d.input_type == "tel" || self.scorer.score(Phone, d, "").is_some();
            if !phone_like {
                continue;
            }
            let stem = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let digit = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(9);
            groups.entry((d.frame_index, stem)).or_default().push((digit, index));
        }

        let mut ordered: Vec<_> = groups.into_values().collect();
        ordered.sort_by_key(|members| members.iter().map(|(_, i)| *i).min().unwrap_or(usize::MAX));

        for mut members in ordered {
            members.sort();
            let digits: Vec<u32> = members.iter().map(|(d, _)| *d).collect();
            if digits != [1, 2, 3] && digits != [0, 1, 2] {
                continue;
            }
            let fields = self.fields;
            let mut refused = Vec::new();
            for ((_, index), key) in members.iter().zip([Phone1, Phone2, Phone3]) {
                let d = &fields[*index];
                let verdict = preflight_check(key, WidgetShape::from(d), self.values.get(key).unwrap_or(""));
                if !verdict.ok {
                    refused.push(Rejection {
                        key,
                        selector: d.selector.clone(),
                        reasons: verdict.reasons,
                    });
                }
            }
            if !refused.is_empty() {
                debug!(rejected = refused.len(), "phone group refused by preflight");
                self.outcome.rejections.extend(refused);
                continue;
            }
            for ((_, index), key) in members.iter().zip([Phone1, Phone2, Phone3]) {
                let d = &fields[*index];
                self.claim(key, d, PHONE_GROUP_SCORE);
            }
            return;
        }
    }

    /// Global greedy assignment over every (key, element) pair.
    ///
    /// Highest score first; ties prefer required elements, then key
    /// priority, then document order.
    fn assign_greedy(&mut self, keys: &[LogicalFieldKey]) {
        let mut candidates = Vec::new();
        for &key in keys {
            if self.outcome.assignments.contains_key(&key) {
                continue;
            }
            let value = self.values.get(key).unwrap_or("");
            let floor = self.config.floor_for(key);
            for (index, d) in self.fields.iter().enumerate() {
                if self.is_claimed(d) {
                    continue;
                }
                if let Some(score) = self.scorer.score(key, d, value) {
                    if score >= floor {
                        candidates.push(Candidate {
                            key,
                            index,
                            score,
                            required: d.is_required(),
                        });
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(b.required.cmp(&a.required))
                .then(a.key.priority().cmp(&b.key.priority()))
                .then(self.fields[a.index].order.cmp(&self.fields[b.index].order))
        });

        let fields = self.fields;
        for c in candidates {
            let d = &fields[c.index];
            if self.outcome.assignments.contains_key(&c.key) || self.is_claimed(d) {
                continue;
            }
            let value = self.values.get(c.key).unwrap_or("");
            let verdict = preflight_check(c.key, WidgetShape::from(d), value);
            if !verdict.ok {
                debug!(key = %c.key, selector = %d.selector, reasons = ?verdict.reasons, "preflight rejected candidate");
                self.outcome.rejections.push(Rejection {
                    key: c.key,
                    selector: d.selector.clone(),
                    reasons: verdict.reasons,
                });
                continue;
            }
            self.claim(c.key, d, c.score);
        }
    }

    /// Unmapped message goes to the first free, unnamed or message-named
    /// textarea.
    fn message_textarea_fallback(&mut self) {
        let key = LogicalFieldKey::Message;
        if !self.values.contains(key) || self.outcome.assignments.contains_key(&key) {
            return;
        }
        let fields = self.fields;
        let found = fields.iter().find(|d| {
            d.is_textarea()
                && self.scorer.is_candidate(d)
                && !self.is_claimed(d)
                && (d.name.trim().is_empty() || MESSAGE_TEXTAREA_NAME.is_match(&d.name))
        });
        if let Some(d) = found {
            debug!(selector = %d.selector, "message placed by textarea fallback");
            self.claim(key, d, 0.0);
        }
    }
}

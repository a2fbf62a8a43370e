use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::extract::descriptor::{FieldDescriptor, SelectOption};
use crate::lexicon::{JobTier, Lexicon, LogicalFieldKey};
use crate::matching::applicant::ApplicantData;
use crate::text::normalize;

/// Option count at which a select is taken to be a prefecture list.
pub const PREFECTURE_MIN_OPTIONS: usize = 20;

const HOKKAIDO: &str = "北海道";
const PREFECTURE_SUFFIXES: [char; 4] = ['都', '道', '府', '県'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectKind {
    Prefecture,
    Inquiry,
    Position,
    Unknown,
}

impl fmt::Display for SelectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectKind::Prefecture => "prefecture",
            SelectKind::Inquiry => "inquiry",
            SelectKind::Position => "position",
            SelectKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// How the chosen option was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceVia {
    ExactCanonical,
    ContainsCanonical,
    Similarity,
    JobTier,
    JobFallback,
    GenericFallback,
}

/// A resolved option for one select widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectDecision {
    pub kind: SelectKind,
    pub option_index: usize,
    pub label: String,
    pub value: String,
    pub via: ChoiceVia,
    /// The applicant text that drove the choice.
    pub reason: String,
}

/// Classify a select by option cardinality and attribute text.
pub fn classify_select(d: &FieldDescriptor, lexicon: &Lexicon) -> SelectKind {
    if d.options.len() >= PREFECTURE_MIN_OPTIONS {
        return SelectKind::Prefecture;
    }
    let attrs = d.attr_text();
    if lexicon.inquiry_attr.is_match(&attrs) {
        SelectKind::Inquiry
    } else if lexicon.position_attr.is_match(&attrs) {
        SelectKind::Position
    } else {
        SelectKind::Unknown
    }
}

/// Blank-valued or "please select" options are never chosen.
pub fn is_placeholder_option(option: &SelectOption, lexicon: &Lexicon) -> bool {
    option.value.trim().is_empty() || lexicon.select_placeholder.is_match(&normalize(&option.text))
}

fn eligible<'o>(options: &'o [SelectOption], lexicon: &'o Lexicon) -> impl Iterator<Item = (usize, &'o SelectOption)> + 'o {
    options
        .iter()
        .enumerate()
        .filter(move |(_, o)| !o.disabled && !is_placeholder_option(o, lexicon))
}

// ============================================================================
// Prefecture
// ============================================================================

/// Whitespace-free normalized text with one trailing 都/道/府/県 removed;
/// anything containing 北海道 is 北海道.
pub fn canonical_prefecture(raw: &str) -> String {
    let t: String = normalize(raw).chars().filter(|c| !c.is_whitespace()).collect();
    if t.contains(HOKKAIDO) {
        return HOKKAIDO.to_string();
    }
    match t.strip_suffix(PREFECTURE_SUFFIXES) {
        Some(stem) => stem.to_string(),
        None => t,
    }
}

/// Exact canonical match on label or value first, then canonical
/// containment. No similarity scoring.
pub fn best_prefecture_match(options: &[SelectOption], prefecture: &str, lexicon: &Lexicon) -> Option<(usize, ChoiceVia)> {
    let target = canonical_prefecture(prefecture);
    if target.is_empty() {
        return None;
    }
    let exact = eligible(options, lexicon).find(|(_, o)| {
        canonical_prefecture(&o.text) == target || canonical_prefecture(&o.value) == target
    });
    if let Some((i, _)) = exact {
        return Some((i, ChoiceVia::ExactCanonical));
    }
    eligible(options, lexicon)
        .find(|(_, o)| {
            canonical_prefecture(&o.text).contains(&target) || canonical_prefecture(&o.value).contains(&target)
        })
        .map(|(i, _)| (i, ChoiceVia::ContainsCanonical))
}

// ============================================================================
// Inquiry category
// ============================================================================

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
    let padded: Vec<char> = std::iter::once(' ')
        .chain(s.chars())
        .chain(std::iter::once(' '))
        .collect();
    let mut counts = HashMap::new();
    for pair in padded.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &HashMap<(char, char), usize>, b: &HashMap<(char, char), usize>) -> f64 {
    let dot: usize = a.iter().filter_map(|(k, x)| b.get(k).map(|y| x * y)).sum();
    let norm = |m: &HashMap<(char, char), usize>| (m.values().map(|v| v * v).sum::<usize>() as f64).sqrt();
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot as f64 / (na * nb)
}

fn tokens<'t>(text: &'t str, lexicon: &Lexicon) -> HashSet<&'t str> {
    lexicon.token_split.split(text).filter(|t| !t.is_empty()).collect()
}

/// Phrase-vs-option similarity: exact +1.5, containment +1.0, 0.9 x
/// bigram cosine, 0.6 x token overlap, plus a small length bonus.
pub fn score_inquiry_option(label: &str, query: &str, lexicon: &Lexicon) -> f64 {
    let t = normalize(label);
    let q = normalize(query);
    let mut score = 0.0;
    if t == q {
        score += 1.5;
    }
    if t.contains(&q) {
        score += 1.0;
    }
    score += 0.9 * cosine(&bigrams(&t), &bigrams(&q));
    let query_tokens = tokens(&q, lexicon);
    if !query_tokens.is_empty() {
        let shared = tokens(&t, lexicon).intersection(&query_tokens).count();
        score += 0.6 * shared as f64 / query_tokens.len() as f64;
    }
    score += label.chars().count().min(60) as f64 * 0.005;
    score
}

/// Whether option and phrase share any token or contain one another.
fn overlaps(label: &str, query: &str, lexicon: &Lexicon) -> bool {
    let t = normalize(label);
    let q = normalize(query);
    if t.is_empty() || q.is_empty() {
        return false;
    }
    if t.contains(&q) || q.contains(&t) {
        return true;
    }
    !tokens(&t, lexicon).is_disjoint(&tokens(&q, lexicon))
}

/// Best-scoring option at or above `threshold`; ties go to the first one.
pub fn choose_inquiry(options: &[SelectOption], phrase: &str, lexicon: &Lexicon, threshold: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, option) in eligible(options, lexicon) {
        if !overlaps(&option.text, phrase, lexicon) {
            continue;
        }
        let mut score = score_inquiry_option(&option.text, phrase, lexicon);
        if lexicon.inquiry_penalty.is_match(&option.text) {
            score -= 5.0;
        }
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.filter(|(_, s)| *s >= threshold).map(|(i, _)| i)
}

// ============================================================================
// Job position
// ============================================================================

/// Seniority tier of a job title. A C-level acronym is always executive.
pub fn job_tier_for(title: &str, lexicon: &Lexicon) -> Option<JobTier> {
    let t = normalize(title);
    if t.is_empty() {
        return None;
    }
    if lexicon.job_c_level.is_match(&t) {
        return Some(JobTier::Executive);
    }
    lexicon
        .job_tiers
        .iter()
        .find(|(_, re)| re.is_match(&t))
        .map(|(tier, _)| *tier)
}

/// Tier vocabulary in priority order, then any general/other option.
pub fn choose_job_option(options: &[SelectOption], tier: JobTier, lexicon: &Lexicon) -> Option<(usize, ChoiceVia)> {
    let words = lexicon.job_options.get(&tier).map(Vec::as_slice).unwrap_or(&[]);
    for word in words {
        let word = normalize(word);
        if let Some((i, _)) = eligible(options, lexicon).find(|(_, o)| normalize(&o.text).contains(&word)) {
            return Some((i, ChoiceVia::JobTier));
        }
    }
    eligible(options, lexicon)
        .find(|(_, o)| lexicon.job_fallback.is_match(&o.text))
        .map(|(i, _)| (i, ChoiceVia::JobFallback))
}

/// Last resort: first eligible option reading like contact/other/general.
pub fn generic_fallback(options: &[SelectOption], lexicon: &Lexicon) -> Option<usize> {
    eligible(options, lexicon)
        .find(|(_, o)| lexicon.generic_fallback.is_match(&normalize(&o.text)))
        .map(|(i, _)| i)
}

// ============================================================================
// Resolution
// ============================================================================

/// Applicant text for each select kind, via the lexicon's data aliases.
pub struct SelectInputs<'a> {
    pub prefecture: Option<&'a str>,
    pub inquiry: Option<&'a str>,
    pub job_title: Option<&'a str>,
}

impl<'a> SelectInputs<'a> {
    pub fn from_data(data: &'a ApplicantData, lexicon: &Lexicon) -> Self {
        SelectInputs {
            prefecture: data.first_of(&lexicon.data_aliases.prefecture),
            inquiry: data.first_of(&lexicon.data_aliases.inquiry),
            job_title: data.first_of(&lexicon.data_aliases.job_title),
        }
    }
}

/// Classify `d` and pick an option. Unknown selects are never guessed.
pub fn resolve_select(d: &FieldDescriptor, inputs: &SelectInputs<'_>, lexicon: &Lexicon, threshold: f64) -> Option<SelectDecision> {
    let kind = classify_select(d, lexicon);
    if kind == SelectKind::Unknown {
        debug!(selector = %d.selector, "select left alone: unknown kind");
        return None;
    }
    resolve_as(kind, d, inputs, lexicon, threshold)
}

/// Pick an option for a select already assigned to `key`, using the
/// assigned value as the driving text.
pub fn resolve_assigned_select(
    d: &FieldDescriptor,
    key: LogicalFieldKey,
    value: &str,
    lexicon: &Lexicon,
    threshold: f64,
) -> Option<SelectDecision> {
    let kind = match key {
        LogicalFieldKey::Prefecture => SelectKind::Prefecture,
        LogicalFieldKey::Position => SelectKind::Position,
        _ => SelectKind::Inquiry,
    };
    let inputs = SelectInputs {
        prefecture: Some(value),
        inquiry: Some(value),
        job_title: Some(value),
    };
    resolve_as(kind, d, &inputs, lexicon, threshold)
}

fn resolve_as(
    kind: SelectKind,
    d: &FieldDescriptor,
    inputs: &SelectInputs<'_>,
    lexicon: &Lexicon,
    threshold: f64,
) -> Option<SelectDecision> {
    let options = &d.options;
    let (picked, reason) = match kind {
        SelectKind::Prefecture => (
            inputs.prefecture.and_then(|p| best_prefecture_match(options, p, lexicon)),
            inputs.prefecture.unwrap_or_default(),
        ),
        SelectKind::Inquiry => (
            inputs
                .inquiry
                .and_then(|q| choose_inquiry(options, q, lexicon, threshold))
                .map(|i| (i, ChoiceVia::Similarity)),
            inputs.inquiry.unwrap_or_default(),
        ),
        SelectKind::Position => (
            inputs
                .job_title
                .and_then(|t| job_tier_for(t, lexicon))
                .and_then(|tier| choose_job_option(options, tier, lexicon)),
            inputs.job_title.unwrap_or_default(),
        ),
        SelectKind::Unknown => (None, ""),
    };

    let (index, via) = picked.or_else(|| generic_fallback(options, lexicon).map(|i| (i, ChoiceVia::GenericFallback)))?;
    let option = &options[index];
    Some(SelectDecision {
        kind,
        option_index: index,
        label: option.text.clone(),
        value: option.value.clone(),
        via,
        reason: reason.to_string(),
    })
}

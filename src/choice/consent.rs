use std::collections::HashSet;

use serde::Serialize;

use crate::choice::radio::{option_text, radio_groups};
use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::Lexicon;
use crate::text::normalize;

/// An element matched by one of the fixed consent selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedHit {
    pub frame_index: usize,
    /// Re-locating selector for the matched element.
    pub selector: String,
    /// The fixed selector that matched.
    pub query: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentVia {
    FixedSelector,
    Checkbox,
    RadioGroup,
    OptIn,
}

/// One element to check, in the order it should be tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentAction {
    pub frame_index: usize,
    pub selector: String,
    pub via: ConsentVia,
    pub label: String,
}

/// Name, id, class, ARIA, label and group text of a checkable control.
pub fn checkable_text(d: &FieldDescriptor) -> String {
    normalize(&format!(
        "{} {} {} {} {} {}",
        d.name, d.id, d.class, d.aria_label, d.label_text, d.context_text
    ))
}

/// Consent targets in trial order: fixed high-confidence selectors, then
/// checkboxes with consent vocabulary, then consent radio groups
/// (preferring an explicit yes/agree member). The caller stops at the
/// first one it manages to check.
pub fn consent_candidates(fields: &[FieldDescriptor], fixed_hits: &[FixedHit], lexicon: &Lexicon) -> Vec<ConsentAction> {
    let mut seen: HashSet<(usize, String)> = HashSet::new();
    let mut out = Vec::new();
    let mut push = |action: ConsentAction, out: &mut Vec<ConsentAction>| {
        if seen.insert((action.frame_index, action.selector.clone())) {
            out.push(action);
        }
    };

    for hit in fixed_hits.iter().filter(|h| !h.checked) {
        push(
            ConsentAction {
                frame_index: hit.frame_index,
                selector: hit.selector.clone(),
                via: ConsentVia::FixedSelector,
                label: hit.query.clone(),
            },
            &mut out,
        );
    }

    for d in fields
        .iter()
        .filter(|d| d.is_checkbox() && !d.disabled && !d.checked && d.is_locatable())
    {
        if lexicon.consent_vocabulary.is_match(&checkable_text(d)) {
            push(
                ConsentAction {
                    frame_index: d.frame_index,
                    selector: d.selector.clone(),
                    via: ConsentVia::Checkbox,
                    label: d.label_text.clone(),
                },
                &mut out,
            );
        }
    }

    for group in radio_groups(fields) {
        if !lexicon.consent_vocabulary.is_match(&group.full_text()) {
            continue;
        }
        let agrees = |m: &FieldDescriptor| {
            let text = option_text(m);
            lexicon.consent_affirmative.is_match(&text) && !lexicon.radio_negative.any_word(&text)
        };
        if group.members.iter().any(|m| m.checked && agrees(m)) {
            continue;
        }
        let target = group
            .members
            .iter()
            .find(|m| agrees(m))
            .or_else(|| group.members.first());
        if let Some(m) = target {
            push(
                ConsentAction {
                    frame_index: m.frame_index,
                    selector: m.selector.clone(),
                    via: ConsentVia::RadioGroup,
                    label: m.label_text.clone(),
                },
                &mut out,
            );
        }
    }

    out
}

/// Non-consent checkboxes for the optional opt-in helper, category/type
/// tagged ones first. At most one of them should end up checked.
pub fn optin_candidates(fields: &[FieldDescriptor], lexicon: &Lexicon) -> Vec<ConsentAction> {
    let mut tagged = Vec::new();
    let mut rest = Vec::new();
    for d in fields
        .iter()
        .filter(|d| d.is_checkbox() && !d.disabled && !d.checked && d.is_locatable())
    {
        let text = checkable_text(d);
        if lexicon.consent_vocabulary.is_match(&text) || lexicon.radio_marketing.any_in(&text) {
            continue;
        }
        let action = ConsentAction {
            frame_index: d.frame_index,
            selector: d.selector.clone(),
            via: ConsentVia::OptIn,
            label: d.label_text.clone(),
        };
        if lexicon.optin_prefer.is_match(&text) {
            tagged.push(action);
        } else {
            rest.push(action);
        }
    }
    tagged.extend(rest);
    tagged
}

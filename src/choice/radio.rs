use serde::Serialize;
use tracing::debug;

use crate::extract::descriptor::FieldDescriptor;
use crate::lexicon::Lexicon;
use crate::text::normalize;

/// Radios sharing one `name` within one frame.
#[derive(Debug, Clone)]
pub struct RadioGroup<'a> {
    pub frame_index: usize,
    pub name: String,
    pub members: Vec<&'a FieldDescriptor>,
}

impl RadioGroup<'_> {
    pub fn has_selection(&self) -> bool {
        self.members.iter().any(|m| m.checked)
    }

    /// Required by attribute or ARIA on any member.
    pub fn explicitly_required(&self) -> bool {
        self.members.iter().any(|m| m.is_required())
    }

    /// Legend / heading / name text around the group, normalized.
    pub fn group_text(&self) -> String {
        let first = self.members.first();
        let parts = [
            first.map_or("", |m| m.context_text.as_str()),
            self.name.as_str(),
        ];
        normalize(&parts.join(" "))
    }

    /// Group text plus every member's label and value.
    pub fn full_text(&self) -> String {
        let mut parts = vec![self.group_text()];
        for m in &self.members {
            parts.push(option_text(m));
        }
        parts.join(" ")
    }
}

/// A member's own label and value, normalized.
pub fn option_text(m: &FieldDescriptor) -> String {
    normalize(&format!("{} {}", m.label_text, m.value))
}

/// Group enabled radios by (frame, name). Nameless radios form no group.
pub fn radio_groups(fields: &[FieldDescriptor]) -> Vec<RadioGroup<'_>> {
    let mut groups: Vec<RadioGroup<'_>> = Vec::new();
    for d in fields.iter().filter(|d| d.is_radio() && !d.disabled && d.is_locatable()) {
        if d.name.trim().is_empty() {
            continue;
        }
        match groups
            .iter_mut()
            .find(|g| g.frame_index == d.frame_index && g.name == d.name)
        {
            Some(group) => group.members.push(d),
            None => groups.push(RadioGroup {
                frame_index: d.frame_index,
                name: d.name.clone(),
                members: vec![d],
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RadioVia {
    Affirmative,
    FirstEnabled,
}

/// The member to check in one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioPick {
    pub frame_index: usize,
    pub group: String,
    pub selector: String,
    pub label: String,
    pub via: RadioVia,
    pub required: bool,
}

/// Member textually signalling yes/consent, excluding explicit refusals.
pub fn affirmative_member<'a>(group: &RadioGroup<'a>, lexicon: &Lexicon) -> Option<&'a FieldDescriptor> {
    group.members.iter().copied().find(|m| {
        let text = option_text(m);
        lexicon.radio_positive.any_word(&text) && !lexicon.radio_negative.any_word(&text)
    })
}

/// Choose a member for every unselected group.
///
/// Groups reading like newsletters or promotions are left alone unless
/// required by attribute, ARIA or a required marker in their heading.
pub fn plan_required_radios(fields: &[FieldDescriptor], lexicon: &Lexicon) -> Vec<RadioPick> {
    let mut picks = Vec::new();
    for group in radio_groups(fields) {
        if group.has_selection() {
            continue;
        }
        let heading = group.group_text();
        let required = group.explicitly_required() || lexicon.radio_required_markers.any_in(&heading);
        let marketing = lexicon.radio_marketing.any_in(&group.full_text());
        if marketing && !required {
            debug!(group = %group.name, "marketing radio group left untouched");
            continue;
        }

        let preferred = affirmative_member(&group, lexicon).map(|m| (m, RadioVia::Affirmative));
        let (target, via) = match preferred {
            Some(found) => found,
            None => match group.members.first() {
                Some(m) => (*m, RadioVia::FirstEnabled),
                None => continue,
            },
        };
        picks.push(RadioPick {
            frame_index: group.frame_index,
            group: group.name.clone(),
            selector: target.selector.clone(),
            label: target.label_text.clone(),
            via,
            required,
        });
    }
    picks
}

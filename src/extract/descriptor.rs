use serde::{Deserialize, Serialize};

use crate::text::normalize;

/// Element geometry in CSS pixels, as reported by the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "width")]
    pub w: f64,
    #[serde(alias = "height")]
    pub h: f64,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Positioned far outside the viewport, the usual honeypot trick.
    pub fn is_offscreen(&self) -> bool {
        self.x + self.w < -500.0 || self.y + self.h < -500.0
    }
}

/// One `<option>`: (visible text, value attribute, disabled).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(text: &str, value: &str, disabled: bool) -> Self {
        Self {
            text: text.trim().to_string(),
            value: value.trim().to_string(),
            disabled,
        }
    }
}

impl From<(&str, &str, bool)> for SelectOption {
    fn from((text, value, disabled): (&str, &str, bool)) -> Self {
        SelectOption::new(text, value, disabled)
    }
}

/// Structured description of one fillable element on a scanned page.
///
/// Produced fresh per scan, owned by the matching pass that consumes it.
/// Field names follow the extraction script's JSON (camelCase).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldDescriptor {
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub class: String,
    pub placeholder: String,
    pub aria_label: String,
    pub label_text: String,
    pub autocomplete: String,
    pub required: bool,
    pub aria_required: bool,
    pub pattern: String,
    pub maxlength: Option<u32>,
    pub role: String,
    pub visible: bool,
    /// Absent when geometry is unknown (static HTML).
    pub rect: Option<Rect>,
    /// Re-locates the element uniquely within its frame.
    pub selector: String,
    pub frame_url: String,
    /// Index of the owning frame in the driver's frame list (0 = main).
    pub frame_index: usize,
    /// Document order within the scan.
    pub order: usize,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    /// Group context: fieldset legend, row header, `dt`, container text.
    pub context_text: String,
    pub options: Vec<SelectOption>,
}

impl FieldDescriptor {
    /// Normalized attribute blob used for pattern matching.
    pub fn attr_text(&self) -> String {
        let parts = [
            self.name.as_str(),
            self.id.as_str(),
            self.class.as_str(),
            self.aria_label.as_str(),
            self.label_text.as_str(),
            self.placeholder.as_str(),
        ];
        normalize(&parts.join(" "))
    }

    pub fn is_select(&self) -> bool {
        self.tag == "select"
    }

    pub fn is_textarea(&self) -> bool {
        self.tag == "textarea"
    }

    pub fn is_checkbox(&self) -> bool {
        self.tag == "input" && self.input_type == "checkbox"
    }

    pub fn is_radio(&self) -> bool {
        self.tag == "input" && self.input_type == "radio"
    }

    /// Text-like control a value can be typed into.
    pub fn is_text_entry(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => matches!(
                self.input_type.as_str(),
                "" | "text" | "email" | "tel" | "url" | "number" | "search"
            ),
            _ => false,
        }
    }

    /// Required by attribute or ARIA.
    pub fn is_required(&self) -> bool {
        self.required || self.aria_required
    }

    pub fn is_locatable(&self) -> bool {
        !self.selector.trim().is_empty()
    }

    /// Rendered with no area or pushed off-screen.
    pub fn is_collapsed(&self) -> bool {
        self.rect.is_some_and(|r| r.is_empty() || r.is_offscreen())
    }
}

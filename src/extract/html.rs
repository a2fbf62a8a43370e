use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::extract::descriptor::{FieldDescriptor, SelectOption};
use crate::text::normalize::{collapse_whitespace, css_escape_ident, css_quote, truncate_chars};

/// Longest nearby-text label accepted by the sibling fallback.
pub const NEARBY_TEXT_MAX_CHARS: usize = 80;
/// Sibling hops walked by the nearby-text fallback.
pub const NEARBY_TEXT_MAX_HOPS: usize = 3;

const FIELD_QUERY: &str = "input, textarea, select";

/// Extract descriptors from a static HTML document (one frame).
///
/// `scope` restricts the scan to the first element matching a CSS selector;
/// an unknown or invalid scope scans the whole document. Selectors are
/// always made unique against the whole document.
pub fn extract_fields_from_html(html: &str, frame_url: &str, scope: Option<&str>) -> Vec<FieldDescriptor> {
    let doc = Html::parse_document(html);
    extract_from_document(&doc, frame_url, 0, scope)
}

/// Extract from several frame documents, main document first.
pub fn extract_fields_from_frames(frames: &[(String, String)], scope: Option<&str>) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    for (index, (frame_url, html)) in frames.iter().enumerate() {
        let doc = Html::parse_document(html);
        let mut part = extract_from_document(&doc, frame_url, index, scope);
        let offset = out.len();
        for d in part.iter_mut() {
            d.order += offset;
        }
        out.extend(part);
    }
    out
}

fn extract_from_document(doc: &Html, frame_url: &str, frame_index: usize, scope: Option<&str>) -> Vec<FieldDescriptor> {
    let Ok(field_sel) = Selector::parse(FIELD_QUERY) else {
        return Vec::new();
    };

    let root = scope
        .and_then(|s| Selector::parse(s).ok())
        .and_then(|s| doc.select(&s).next());

    let elements: Vec<ElementRef<'_>> = match root {
        Some(root) => root.select(&field_sel).collect(),
        None => doc.select(&field_sel).collect(),
    };

    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        match describe(doc, el, frame_url, frame_index) {
            Some(mut descriptor) => {
                descriptor.order = out.len();
                out.push(descriptor);
            }
            None => debug!(tag = el.value().name(), "skipped element without a locatable selector"),
        }
    }
    out
}

fn describe(doc: &Html, el: ElementRef<'_>, frame_url: &str, frame_index: usize) -> Option<FieldDescriptor> {
    let value = el.value();
    let tag = value.name().to_lowercase();
    let attr = |name: &str| collapse_whitespace(value.attr(name).unwrap_or(""));

    let input_type = attr("type").to_lowercase();
    let selector = selector_for(doc, el)?;

    let options = if tag == "select" {
        select_options(el)
    } else {
        Vec::new()
    };

    Some(FieldDescriptor {
        tag: tag.clone(),
        input_type: input_type.clone(),
        name: attr("name"),
        id: attr("id"),
        class: attr("class"),
        placeholder: attr("placeholder"),
        aria_label: attr("aria-label"),
        label_text: resolve_label(doc, el),
        autocomplete: attr("autocomplete"),
        required: value.attr("required").is_some(),
        aria_required: matches!(attr("aria-required").to_lowercase().as_str(), "true" | "1"),
        pattern: attr("pattern"),
        maxlength: attr("maxlength").parse().ok(),
        role: attr("role"),
        visible: is_visible(el, &input_type),
        rect: None,
        selector,
        frame_url: frame_url.to_string(),
        frame_index,
        order: 0,
        value: if tag == "textarea" { inner_text(el) } else { attr("value") },
        checked: value.attr("checked").is_some() || value.attr("selected").is_some(),
        disabled: value.attr("disabled").is_some(),
        context_text: group_context(doc, el),
        options,
    })
}

// ============================================================================
// Label resolution
// ============================================================================

/// Resolve the human label for a control. First non-empty strategy wins:
/// `label[for]`, ancestor `<label>`, `dt` of the enclosing `dd`, row `th`,
/// `aria-labelledby`, fieldset legend, nearby preceding text.
pub fn resolve_label(doc: &Html, el: ElementRef<'_>) -> String {
    let strategies: [&dyn Fn() -> String; 7] = [
        &|| label_for_id(doc, el),
        &|| ancestor_label(el),
        &|| definition_term(el),
        &|| row_header(el),
        &|| aria_labelledby(doc, el),
        &|| fieldset_legend(el),
        &|| nearby_text(el),
    ];
    strategies
        .iter()
        .map(|strategy| strategy())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn label_for_id(doc: &Html, el: ElementRef<'_>) -> String {
    let Some(id) = el.value().attr("id").filter(|id| !id.is_empty()) else {
        return String::new();
    };
    Selector::parse(&format!("label[for={}]", css_quote(id)))
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(inner_text)
        .unwrap_or_default()
}

fn ancestor_label(el: ElementRef<'_>) -> String {
    closest(el, |a| a.value().name() == "label")
        .map(inner_text)
        .unwrap_or_default()
}

fn definition_term(el: ElementRef<'_>) -> String {
    closest(el, |a| a.value().name() == "dd")
        .and_then(previous_element)
        .filter(|prev| prev.value().name() == "dt")
        .map(inner_text)
        .unwrap_or_default()
}

fn row_header(el: ElementRef<'_>) -> String {
    let Ok(th) = Selector::parse("th") else {
        return String::new();
    };
    closest(el, |a| a.value().name() == "tr")
        .and_then(|tr| tr.select(&th).next())
        .map(inner_text)
        .unwrap_or_default()
}

fn aria_labelledby(doc: &Html, el: ElementRef<'_>) -> String {
    let ids = el.value().attr("aria-labelledby").unwrap_or("");
    let parts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| Selector::parse(&format!("[id={}]", css_quote(id))).ok())
        .filter_map(|sel| doc.select(&sel).next().map(inner_text))
        .filter(|t| !t.is_empty())
        .collect();
    parts.join(" ")
}

fn fieldset_legend(el: ElementRef<'_>) -> String {
    let Ok(legend) = Selector::parse("legend") else {
        return String::new();
    };
    closest(el, |a| a.value().name() == "fieldset")
        .and_then(|fs| fs.select(&legend).next())
        .map(inner_text)
        .unwrap_or_default()
}

fn nearby_text(el: ElementRef<'_>) -> String {
    if let Some(text) = labelish_sibling(el) {
        return text;
    }
    parent_element(el)
        .and_then(labelish_sibling)
        .unwrap_or_default()
}

/// First of up to three preceding element siblings that is short text and
/// holds no control of its own.
fn labelish_sibling(el: ElementRef<'_>) -> Option<String> {
    let Ok(controls) = Selector::parse("input, textarea, select, button") else {
        return None;
    };
    let mut current = previous_element(el);
    for _ in 0..NEARBY_TEXT_MAX_HOPS {
        let sib = current?;
        if sib.select(&controls).next().is_none() {
            let text = inner_text(sib);
            if !text.is_empty() && text.chars().count() <= NEARBY_TEXT_MAX_CHARS {
                return Some(text);
            }
        }
        current = previous_element(sib);
    }
    None
}

/// Legend, row header and `dt` text around a control; used to judge
/// radio/checkbox groups.
fn group_context(doc: &Html, el: ElementRef<'_>) -> String {
    let mut parts = vec![fieldset_legend(el), row_header(el), definition_term(el)];
    if let Some(group) = closest(el, |a| a.value().attr("role") == Some("group")) {
        parts.push(aria_labelledby(doc, group));
        parts.push(collapse_whitespace(group.value().attr("aria-label").unwrap_or("")));
    }
    let joined = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, 200)
}

// ============================================================================
// Visibility
// ============================================================================

fn is_visible(el: ElementRef<'_>, input_type: &str) -> bool {
    if el.value().name() == "input" && input_type == "hidden" {
        return false;
    }
    let mut node = Some(el);
    while let Some(current) = node {
        if hides(current) {
            return false;
        }
        node = parent_element(current);
    }
    true
}

fn hides(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() || value.name() == "template" {
        return true;
    }
    let style: String = value
        .attr("style")
        .unwrap_or("")
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    style.split(';').any(|decl| {
        matches!(
            decl,
            "display:none" | "visibility:hidden" | "opacity:0" | "opacity:0.0"
        )
    })
}

// ============================================================================
// Selector generation
// ============================================================================

/// Build a selector that re-locates `el` uniquely: `#id`, then
/// `tag[name]`, `tag[aria-label]`, `tag[placeholder]`, else the
/// positional `nth-of-type` path from the root.
pub fn selector_for(doc: &Html, el: ElementRef<'_>) -> Option<String> {
    let value = el.value();
    let tag = value.name();

    let mut candidates = Vec::new();
    if let Some(id) = value.attr("id").filter(|v| !v.is_empty()) {
        candidates.push(format!("#{}", css_escape_ident(id)));
    }
    for attr in ["name", "aria-label", "placeholder"] {
        if let Some(v) = value.attr(attr).filter(|v| !v.is_empty()) {
            candidates.push(format!("{}[{}={}]", tag, attr, css_quote(v)));
        }
    }

    candidates
        .into_iter()
        .find(|candidate| selects_only(doc, candidate, el))
        .or_else(|| Some(positional_path(el)))
}

fn selects_only(doc: &Html, candidate: &str, el: ElementRef<'_>) -> bool {
    let Ok(sel) = Selector::parse(candidate) else {
        return false;
    };
    let mut hits = doc.select(&sel);
    matches!((hits.next(), hits.next()), (Some(first), None) if first == el)
}

/// `html:nth-of-type(1) > body:nth-of-type(1) > ... > input:nth-of-type(2)`
pub fn positional_path(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    let mut node = Some(el);
    while let Some(current) = node {
        let name = current.value().name();
        let nth = 1 + current
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sib| sib.value().name() == name)
            .count();
        parts.push(format!("{}:nth-of-type({})", name, nth));
        node = parent_element(current);
    }
    parts.reverse();
    parts.join(" > ")
}

// ============================================================================
// Tree helpers
// ============================================================================

fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

fn previous_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.prev_siblings().find_map(ElementRef::wrap)
}

fn closest<'a>(el: ElementRef<'a>, pred: impl Fn(&ElementRef<'a>) -> bool) -> Option<ElementRef<'a>> {
    let mut node = parent_element(el);
    while let Some(current) = node {
        if pred(&current) {
            return Some(current);
        }
        node = parent_element(current);
    }
    None
}

/// Whitespace-collapsed text content.
pub fn inner_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn select_options(el: ElementRef<'_>) -> Vec<SelectOption> {
    let Ok(option_sel) = Selector::parse("option") else {
        return Vec::new();
    };
    el.select(&option_sel)
        .map(|opt| {
            let text = inner_text(opt);
            let value = opt
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| text.clone());
            SelectOption::new(&text, &value, opt.value().attr("disabled").is_some())
        })
        .collect()
}

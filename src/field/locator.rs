use crate::field::field_model::{FieldContext, PageSnapshot, non_empty};

pub const SURROUNDING_TEXT_LIMIT: usize = 500;

const SURROUNDING_CONTAINERS: &[&str] = &["div", "fieldset", "section", "form"];

/// Resolve the human-readable label for a field.
///
/// Order: `label[for=id]`, `aria-label`, enclosing `<label>`, then the
/// placeholder, name or id of the field itself.
pub fn label_text(page: &PageSnapshot, index: usize) -> String {
    let Some(el) = page.node(index) else {
        return String::new();
    };

    let for_label = el
        .attr_id()
        .and_then(|id| page.label_for(id))
        .and_then(|l| page.node(l));
    if let Some(label) = for_label {
        let text = label.inner_text().trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }

    if let Some(aria) = non_empty(el.aria_label.as_deref().map(str::trim)) {
        return aria.to_string();
    }

    if let Some(label) = page.closest(index, &["label"]).and_then(|l| page.node(l)) {
        let text = label.inner_text().trim();
        if !text.is_empty() {
            return text.to_string();
        }
    }

    non_empty(el.placeholder.as_deref().map(str::trim))
        .or(el.attr_name())
        .or(el.attr_id())
        .unwrap_or("")
        .to_string()
}

/// Text of the nearest block container, capped at 500 characters.
pub fn surrounding_text(page: &PageSnapshot, index: usize) -> String {
    let container = page
        .closest(index, SURROUNDING_CONTAINERS)
        .or_else(|| page.parent_of(index));

    container
        .and_then(|c| page.node(c))
        .map(|c| c.inner_text().chars().take(SURROUNDING_TEXT_LIMIT).collect())
        .unwrap_or_default()
}

/// Lower-cased `type` attribute, falling back to the lower-cased tag name.
pub fn field_type(page: &PageSnapshot, index: usize) -> String {
    page.node(index)
        .map(|el| el.input_type().unwrap_or_else(|| el.tag_name()))
        .unwrap_or_default()
}

pub fn locate(page: &PageSnapshot, index: usize) -> FieldContext {
    let Some(el) = page.node(index) else {
        return FieldContext::default();
    };

    FieldContext {
        label_text: label_text(page, index),
        field_type: field_type(page, index),
        name: el.attr_name().unwrap_or("").to_string(),
        id: el.attr_id().unwrap_or("").to_string(),
        placeholder: Some(el.placeholder.clone().unwrap_or_default()),
        surrounding_text: Some(surrounding_text(page, index)),
    }
}

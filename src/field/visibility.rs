use crate::field::field_model::{DomNode, PageSnapshot};

/// How far up the tree a checkbox/radio may look for a visible label block.
pub const MAX_ANCESTOR_DEPTH: usize = 4;

/// Minimum rendered width and height, in CSS pixels.
pub const MIN_BOX_PX: f64 = 2.0;

/// Checkboxes and radios are often hidden behind custom-styled replacements,
/// so they are judged by their label rather than their own box.
pub fn is_choice_control(el: &DomNode) -> bool {
    matches!(
        el.input_type().as_deref(),
        Some("checkbox") | Some("radio")
    ) || matches!(
        el.attr_role().map(str::to_lowercase).as_deref(),
        Some("checkbox") | Some("radio") | Some("switch")
    )
}

pub fn is_eligible(page: &PageSnapshot, index: usize) -> bool {
    let Some(el) = page.node(index) else {
        return false;
    };

    if is_choice_control(el) {
        return choice_label_visible(page, index);
    }

    is_visible(page, index) && has_min_box(el)
}

fn choice_label_visible(page: &PageSnapshot, index: usize) -> bool {
    let label = page
        .node(index)
        .and_then(|el| el.attr_id())
        .and_then(|id| page.label_for(id));
    if label.is_some_and(|l| is_visible(page, l)) {
        return true;
    }

    page.ancestors(index)
        .take(MAX_ANCESTOR_DEPTH)
        .any(|a| is_visible(page, a) && page.node(a).is_some_and(is_text_block))
}

fn is_text_block(el: &DomNode) -> bool {
    has_box(el) && !el.inner_text().trim().is_empty()
}

/// Not hidden by the node's own style, nor by any ancestor.
pub fn is_visible(page: &PageSnapshot, index: usize) -> bool {
    let Some(el) = page.node(index) else {
        return false;
    };

    if !style_shown(el) || el.style.visibility == "hidden" || el.style.visibility == "collapse" {
        return false;
    }

    page.ancestors(index)
        .all(|a| page.node(a).is_some_and(style_shown))
}

/// `display:none`, `hidden` and zero opacity hide the whole subtree.
fn style_shown(el: &DomNode) -> bool {
    !el.hidden && el.style.display != "none" && el.style.opacity > 0.0
}

/// Nodes without a recorded rect are treated as rendered.
fn has_box(el: &DomNode) -> bool {
    el.rect.is_none_or(|r| r.width > 0.0 && r.height > 0.0)
}

fn has_min_box(el: &DomNode) -> bool {
    match el.rect {
        Some(r) => r.width >= MIN_BOX_PX && r.height >= MIN_BOX_PX,
        None => true,
    }
}

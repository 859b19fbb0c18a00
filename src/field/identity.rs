use std::collections::HashMap;
use std::fmt;

use crate::field::field_model::{DomNode, PageSnapshot};
use crate::field::locator::{field_type, label_text};

/// Identity of one live element across rescans of the same page.
///
/// An extractor-assigned `uid` is used as-is. Without one the key is the
/// element's tag, type, name, id and label plus its ordinal among the
/// included elements that share all of those, so inserting or removing an
/// unrelated element does not move it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys for every node of `page` accepted by `include`, by node index.
pub fn element_keys<F>(page: &PageSnapshot, include: F) -> HashMap<usize, ElementKey>
where
    F: Fn(&DomNode) -> bool,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut keys = HashMap::new();

    for (index, el) in page.nodes.iter().enumerate() {
        if !include(el) {
            continue;
        }

        let key = match el.uid.as_deref().filter(|u| !u.is_empty()) {
            Some(uid) => format!("uid:{uid}"),
            None => {
                let base = structural_key(page, index, el);
                let ordinal = seen.entry(base.clone()).or_insert(0);
                let key = format!("{base}#{ordinal}");
                *ordinal += 1;
                key
            }
        };
        keys.insert(index, ElementKey(key));
    }

    keys
}

fn structural_key(page: &PageSnapshot, index: usize, el: &DomNode) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        el.tag_name(),
        field_type(page, index),
        el.attr_name().unwrap_or(""),
        el.attr_id().unwrap_or(""),
        label_text(page, index)
    )
}

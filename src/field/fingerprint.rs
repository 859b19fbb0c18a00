use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::field_model::PageSnapshot;
use crate::field::locator::label_text;

/// Identity of "the same question" across possibly many elements.
///
/// Two fields with the same kind, name, id and label under the same
/// language share one fingerprint and therefore one cached record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldFingerprint(String);

impl FieldFingerprint {
    /// Prefix `key` with the active language tag.
    pub fn new(language: &str, key: &str) -> Self {
        Self(format!("{}::{}", language, key))
    }

    pub fn for_node(page: &PageSnapshot, index: usize, language: &str) -> Option<Self> {
        let el = page.node(index)?;
        let kind = el
            .input_type()
            .or_else(|| el.attr_role().map(str::to_string))
            .unwrap_or_else(|| el.tag_name());

        let key = field_key(
            &kind,
            el.attr_name().unwrap_or(""),
            el.attr_id().unwrap_or(""),
            &label_text(page, index),
        );
        Some(Self::new(language, &key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `kind_name_id_label`, order-sensitive and unhashed.
pub fn field_key(kind: &str, name: &str, id: &str, label: &str) -> String {
    format!("{kind}_{name}_{id}_{label}")
}

use serde::{Deserialize, Serialize};

use crate::field::error::SnapshotError;

/// One element of an extracted page, as produced by the page extractor.
///
/// Nodes are stored in an arena (`PageSnapshot::nodes`); `parent` is the
/// index of the enclosing element, `None` for the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub tag: String,
    /// Identity assigned by the extractor, stable across snapshots of the
    /// same live page.
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    /// `for` attribute of a `<label>`.
    #[serde(default, rename = "for")]
    pub html_for: Option<String>,
    /// Rendered inner text.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub style: NodeStyle,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

/// Computed style subset relevant to visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            display: default_display(),
            visibility: default_visibility(),
            opacity: default_opacity(),
        }
    }
}

fn default_display() -> String {
    "block".to_string()
}

fn default_visibility() -> String {
    "visible".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

impl DomNode {
    /// Lower-cased tag name.
    pub fn tag_name(&self) -> String {
        self.tag.to_lowercase()
    }

    pub fn attr_type(&self) -> Option<&str> {
        non_empty(self.r#type.as_deref())
    }

    /// `type` as the DOM reports it: lower-cased.
    pub fn input_type(&self) -> Option<String> {
        self.attr_type().map(str::to_lowercase)
    }

    pub fn attr_role(&self) -> Option<&str> {
        non_empty(self.role.as_deref())
    }

    pub fn attr_id(&self) -> Option<&str> {
        non_empty(self.id.as_deref())
    }

    pub fn attr_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    pub fn inner_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A page as seen by the scanner: url, title and its element arena.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<DomNode>,
}

impl PageSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let page: PageSnapshot = serde_json::from_str(raw)?;
        page.validate()?;
        Ok(page)
    }

    pub fn load(path: &str) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parent links must point backwards, which also rules out cycles.
    fn validate(&self) -> Result<(), SnapshotError> {
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent >= index {
                    return Err(SnapshotError::BadParent { node: index, parent });
                }
            }
        }
        Ok(())
    }

    pub fn node(&self, index: usize) -> Option<&DomNode> {
        self.nodes.get(index)
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.parent)
    }

    /// Ancestors of `index`, nearest first, excluding the node itself.
    ///
    /// Only existing nodes are yielded and the walk is at most
    /// `nodes.len()` long, so dangling or cyclic parent links in a snapshot
    /// built by hand end the walk instead of panicking or looping.
    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            page: self,
            next: self.parent_of(index),
            remaining: self.nodes.len(),
        }
    }

    /// Closest ancestor whose tag is one of `tags`.
    pub fn closest(&self, index: usize, tags: &[&str]) -> Option<usize> {
        self.ancestors(index).find(|&i| {
            self.node(i)
                .is_some_and(|n| tags.contains(&n.tag_name().as_str()))
        })
    }

    /// `label[for="<id>"]`
    pub fn label_for(&self, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.tag_name() == "label" && n.html_for.as_deref() == Some(id))
    }

    /// Host part of the page url, empty when the url does not parse.
    pub fn domain(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

pub struct Ancestors<'a> {
    page: &'a PageSnapshot,
    next: Option<usize>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next.filter(|&i| i < self.page.nodes.len())?;
        if self.remaining == 0 {
            self.next = None;
            return None;
        }
        self.remaining -= 1;
        self.next = self.page.parent_of(current);
        Some(current)
    }
}

/// Context sent to the relay for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContext {
    #[serde(default, alias = "label")]
    pub label_text: String,
    #[serde(default, rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrounding_text: Option<String>,
}

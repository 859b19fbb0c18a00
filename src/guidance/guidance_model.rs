use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::field_model::FieldContext;

pub const FALLBACK_EXPLANATION: &str = "Provide the requested information in this field.";

// ============================================================================
// Wire types
// ============================================================================

/// Structured guidance for one field, as shown in the tooltip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceRecord {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub format_hint: String,
    #[serde(default)]
    pub caution: String,
}

impl GuidanceRecord {
    pub fn new(explanation: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
            ..Default::default()
        }
    }

    /// Generic record used when no model guidance is available.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_EXPLANATION)
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = hint.into();
        self
    }

    pub fn with_caution(mut self, caution: impl Into<String>) -> Self {
        self.caution = caution.into();
        self
    }

    /// Worth showing: a tooltip needs at least an explanation.
    pub fn is_usable(&self) -> bool {
        !self.explanation.trim().is_empty()
    }
}

/// Body of `POST /guidance`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceRequest {
    #[serde(default)]
    pub page_domain: String,
    #[serde(default)]
    pub user_language: String,
    #[serde(default)]
    pub field_context: FieldContext,
}

// ============================================================================
// Payload normalization
// ============================================================================

/// A guidance payload resolved once at the client boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidanceParseResult {
    /// Object with an `explanation` string.
    Valid(GuidanceRecord),
    /// Object (or null) missing `explanation`; whatever typed fields were present.
    Degraded(GuidanceRecord),
    /// Plain text that is not JSON.
    Unparseable(String),
}

impl GuidanceParseResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, GuidanceParseResult::Valid(_))
    }

    /// Best-effort record; never fails.
    pub fn into_record(self) -> GuidanceRecord {
        match self {
            GuidanceParseResult::Valid(record) | GuidanceParseResult::Degraded(record) => record,
            GuidanceParseResult::Unparseable(raw) => GuidanceRecord::new(raw.trim()),
        }
    }

    /// Parse relay or model text. Code fences are stripped first.
    pub fn from_text(text: &str) -> Self {
        let stripped = strip_code_fences(text);
        match serde_json::from_str::<Value>(stripped) {
            // A bare JSON string is resolved once more: double-encoded payloads.
            Ok(Value::String(inner)) => {
                match serde_json::from_str::<Value>(strip_code_fences(&inner)) {
                    Ok(value @ Value::Object(_)) => Self::from(value),
                    _ => GuidanceParseResult::Unparseable(inner),
                }
            }
            Ok(value) => Self::from(value),
            Err(_) => GuidanceParseResult::Unparseable(stripped.to_string()),
        }
    }
}

impl From<Value> for GuidanceParseResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => from_object(&map),
            Value::String(text) => GuidanceParseResult::from_text(&text),
            Value::Null => GuidanceParseResult::Degraded(GuidanceRecord::default()),
            other => GuidanceParseResult::Unparseable(other.to_string()),
        }
    }
}

impl From<GuidanceRecord> for GuidanceParseResult {
    fn from(record: GuidanceRecord) -> Self {
        GuidanceParseResult::Valid(record)
    }
}

impl From<&str> for GuidanceParseResult {
    fn from(text: &str) -> Self {
        GuidanceParseResult::from(Value::String(text.to_string()))
    }
}

impl From<String> for GuidanceParseResult {
    fn from(text: String) -> Self {
        GuidanceParseResult::from(Value::String(text))
    }
}

fn from_object(map: &Map<String, Value>) -> GuidanceParseResult {
    let text = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let examples = match map.get("examples") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => Vec::new(),
    };

    let record = GuidanceRecord {
        explanation: text("explanation"),
        examples,
        format_hint: text("format_hint"),
        caution: text("caution"),
    };

    match map.get("explanation") {
        Some(Value::String(_)) => GuidanceParseResult::Valid(record),
        _ => GuidanceParseResult::Degraded(record),
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let rest = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        body = rest.trim_start();
    }

    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim_end();
    }

    body
}

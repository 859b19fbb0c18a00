use serde::Serialize;

use crate::guidance::guidance_model::{GuidanceParseResult, GuidanceRecord, GuidanceRequest};

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const SYSTEM_PROMPT: &str = r#"You are a multilingual form-field guidance assistant.

Analyze the field_context provided (label_text, type, name, placeholder, surrounding_text) and generate SPECIFIC, CONTEXTUAL guidance in the requested language.

**CRITICAL RULES:**
1. Read the label_text and surrounding_text carefully to understand what the field is asking for
2. Provide guidance SPECIFIC to that field's question - never give generic advice
3. For name fields, explain how to format names properly
4. For email fields, explain email format and purpose
5. For radio/select fields, explain what the question is asking and how to choose
6. Use the field's actual label to frame your guidance
7. Be concise (2-3 sentences max)
8. Use culturally appropriate examples

Output ONLY valid JSON with these keys:
{
  "explanation": "Short, specific guidance addressing the exact field question",
  "examples": ["Example 1", "Example 2"],
  "format_hint": "Format requirements if any",
  "caution": "Important notes or warnings"
}

NEVER give generic responses like "Please provide your answer" - always reference the specific field's purpose."#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// System prompt plus the request itself, serialized as the user turn.
pub fn build_messages(request: &GuidanceRequest) -> Vec<ChatMessage> {
    let user = serde_json::to_string(request).unwrap_or_else(|_| "{}".to_string());
    vec![
        ChatMessage {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: user,
        },
    ]
}

/// Turn the model's raw reply into a record. Non-JSON text becomes the
/// explanation.
pub fn parse_model_reply(text: &str) -> GuidanceRecord {
    GuidanceParseResult::from_text(text).into_record()
}

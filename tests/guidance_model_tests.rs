use serde_json::json;

use formsaathi::guidance::guidance_model::{
    FALLBACK_EXPLANATION, GuidanceParseResult, GuidanceRecord, GuidanceRequest,
};
use formsaathi::relay::prompt::{Role, SYSTEM_PROMPT, build_messages, parse_model_reply};

use crate::common::utils::email_record;

mod common;

// =========================================================================
// Payload normalization
// =========================================================================

#[test]
fn complete_object_is_valid() {
    let parsed = GuidanceParseResult::from(json!({
        "explanation": "Enter a valid email address.",
        "examples": ["name@example.com"],
        "format_hint": "user@domain.tld",
        "caution": ""
    }));
    assert_eq!(parsed, GuidanceParseResult::Valid(email_record()));
}

#[test]
fn object_without_explanation_is_degraded() {
    let parsed = GuidanceParseResult::from(json!({"examples": ["A+", "O-"]}));
    assert!(!parsed.is_valid());
    assert_eq!(
        parsed,
        GuidanceParseResult::Degraded(GuidanceRecord::default().with_examples(["A+", "O-"]))
    );
}

#[test]
fn wrongly_typed_fields_default() {
    let parsed = GuidanceParseResult::from(json!({
        "explanation": 42,
        "examples": [1, "two", null],
        "format_hint": ["x"],
        "caution": "Keep it private."
    }));
    let record = parsed.clone().into_record();

    assert!(matches!(parsed, GuidanceParseResult::Degraded(_)));
    assert_eq!(record.explanation, "");
    assert_eq!(record.examples, vec!["two".to_string()]);
    assert_eq!(record.format_hint, "");
    assert_eq!(record.caution, "Keep it private.");
}

#[test]
fn single_example_string_becomes_list() {
    let record = GuidanceParseResult::from(json!({
        "explanation": "Your 6-digit PIN code.",
        "examples": "110001"
    }))
    .into_record();
    assert_eq!(record.examples, vec!["110001".to_string()]);
}

#[test]
fn plain_text_is_unparseable() {
    let parsed = GuidanceParseResult::from("Type your full name as on your ID.");
    assert_eq!(
        parsed,
        GuidanceParseResult::Unparseable("Type your full name as on your ID.".into())
    );
    assert_eq!(parsed.into_record().explanation, "Type your full name as on your ID.");
}

#[test]
fn null_is_degraded_empty() {
    assert_eq!(
        GuidanceParseResult::from(serde_json::Value::Null),
        GuidanceParseResult::Degraded(GuidanceRecord::default())
    );
}

#[test]
fn number_is_unparseable() {
    assert_eq!(
        GuidanceParseResult::from(json!(7)),
        GuidanceParseResult::Unparseable("7".into())
    );
}

#[test]
fn fenced_json_text_is_valid() {
    let text = "```json\n{\"explanation\": \"Enter your age in years.\", \"examples\": [\"34\"]}\n```";
    let parsed = GuidanceParseResult::from_text(text);
    assert!(parsed.is_valid());
    assert_eq!(parsed.into_record().examples, vec!["34".to_string()]);
}

#[test]
fn double_encoded_text_is_resolved_once() {
    let inner = r#"{"explanation":"Pick one option."}"#;
    let encoded = serde_json::to_string(inner).unwrap();
    let parsed = GuidanceParseResult::from_text(&encoded);
    assert_eq!(parsed, GuidanceParseResult::Valid(GuidanceRecord::new("Pick one option.")));
}

#[test]
fn json_string_of_plain_text_is_unparseable() {
    let parsed = GuidanceParseResult::from_text("\"just words\"");
    assert_eq!(parsed, GuidanceParseResult::Unparseable("just words".into()));
}

#[test]
fn record_converts_to_valid() {
    let parsed: GuidanceParseResult = email_record().into();
    assert!(parsed.is_valid());
}

// =========================================================================
// Records and requests
// =========================================================================

#[test]
fn usable_requires_explanation() {
    assert!(email_record().is_usable());
    assert!(!GuidanceRecord::new("   ").is_usable());
    assert!(!GuidanceRecord::default().with_examples(["x"]).is_usable());
}

#[test]
fn fallback_record() {
    let record = GuidanceRecord::fallback();
    assert_eq!(record.explanation, FALLBACK_EXPLANATION);
    assert!(record.examples.is_empty());
    assert!(record.is_usable());
}

#[test]
fn record_deserializes_partial_json() {
    let record: GuidanceRecord = serde_json::from_str(r#"{"explanation":"x"}"#).unwrap();
    assert_eq!(record, GuidanceRecord::new("x"));
}

#[test]
fn request_wire_shape() {
    let request: GuidanceRequest = serde_json::from_value(json!({
        "page_domain": "example.com",
        "user_language": "hi-IN",
        "field_context": {"label": "Email", "type": "email"}
    }))
    .unwrap();

    assert_eq!(request.field_context.label_text, "Email");
    assert_eq!(request.field_context.field_type, "email");
    assert_eq!(request.field_context.placeholder, None);

    let back = serde_json::to_value(&request).unwrap();
    assert_eq!(back["field_context"]["label_text"], "Email");
    assert!(back["field_context"].get("placeholder").is_none());
}

// =========================================================================
// Prompt building
// =========================================================================

#[test]
fn messages_carry_system_prompt_and_request() {
    let request = GuidanceRequest {
        page_domain: "example.com".into(),
        user_language: "ta-IN".into(),
        ..Default::default()
    };
    let messages = build_messages(&request);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[0].content, SYSTEM_PROMPT);
    assert_eq!(messages[1].role, Role::User);

    let user: GuidanceRequest = serde_json::from_str(&messages[1].content).unwrap();
    assert_eq!(user, request);
}

#[test]
fn role_serializes_lowercase() {
    let messages = build_messages(&GuidanceRequest::default());
    let value = serde_json::to_value(&messages).unwrap();
    assert_eq!(value[0]["role"], "system");
    assert_eq!(value[1]["role"], "user");
}

#[test]
fn model_reply_parsing() {
    assert_eq!(
        parse_model_reply("```json\n{\"explanation\":\"Use DD/MM/YYYY.\"}\n```"),
        GuidanceRecord::new("Use DD/MM/YYYY.")
    );
    assert_eq!(parse_model_reply("  plain advice  "), GuidanceRecord::new("plain advice"));
    assert_eq!(parse_model_reply("{}"), GuidanceRecord::default());
}

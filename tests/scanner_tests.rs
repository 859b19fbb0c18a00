use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use formsaathi::guidance::client::{GuidanceClient, StaticGuidanceClient};
use formsaathi::guidance::error::GuidanceError;
use formsaathi::guidance::guidance_model::{
    FALLBACK_EXPLANATION, GuidanceParseResult, GuidanceRecord, GuidanceRequest,
};
use formsaathi::guidance::session::GuidanceSession;
use formsaathi::scan::scanner::{PageScanner, ScanSettings, is_field_candidate};
use formsaathi::scan::tooltip::{Tooltip, format_tooltip_text, render_tooltip};
use formsaathi::trace::logger::TraceLogger;

use crate::common::pages::{
    hidden_style, input, newsletter_page, newsletter_page_with_phone, node, radio_group_page, text,
};
use crate::common::utils::email_record;

mod common;

/// Remembers every request it answers.
#[derive(Default)]
struct RecordingClient {
    requests: Mutex<Vec<GuidanceRequest>>,
}

#[async_trait]
impl GuidanceClient for RecordingClient {
    async fn fetch(&self, request: &GuidanceRequest) -> Result<GuidanceParseResult, GuidanceError> {
        self.requests.lock().push(request.clone());
        Ok(GuidanceParseResult::Valid(GuidanceRecord::new(format!(
            "Guidance for {}",
            request.field_context.label_text
        ))))
    }
}

fn scanner_with(client: Arc<dyn GuidanceClient>, settings: ScanSettings) -> PageScanner {
    PageScanner::new(GuidanceSession::default(), client, settings)
}

fn contact_record() -> GuidanceRecord {
    GuidanceRecord::new("Choose how we should reach you.")
}

// =========================================================================
// Candidates
// =========================================================================

#[test]
fn candidates_exclude_buttons_and_hidden_inputs() {
    for kind in ["submit", "button", "reset", "image", "hidden", "SUBMIT"] {
        assert!(!is_field_candidate(&input(0, kind)), "{kind} should be skipped");
    }
    for kind in ["text", "email", "radio", "checkbox", "date"] {
        assert!(is_field_candidate(&input(0, kind)), "{kind} should be scanned");
    }
    assert!(is_field_candidate(&node("select", None)));
    assert!(is_field_candidate(&node("textarea", None)));
    assert!(is_field_candidate(&node("input", None)));
    assert!(!is_field_candidate(&node("button", None)));
}

// =========================================================================
// Single field
// =========================================================================

#[tokio::test]
async fn newsletter_email_gets_one_tooltip() {
    let client = Arc::new(StaticGuidanceClient::new(email_record()));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.pass, 1);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.attached(), 1);
    assert_eq!(report.tooltips[0].node, 3);
    assert_eq!(report.tooltips[0].label, "Email");
    assert_eq!(report.tooltips[0].record, email_record());
    assert!(scanner.is_attached(&newsletter_page(), 3));

    let again = scanner.scan(&newsletter_page()).await;
    assert_eq!(again.pass, 2);
    assert_eq!(again.candidates, 0);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn request_carries_domain_language_and_context() {
    let client = Arc::new(RecordingClient::default());
    let settings = ScanSettings {
        user_language: "hi-IN".into(),
        ..Default::default()
    };
    let mut scanner = scanner_with(client.clone(), settings);

    scanner.scan(&newsletter_page()).await;

    let requests = client.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].page_domain, "shop.example.com");
    assert_eq!(requests[0].user_language, "hi-IN");
    assert_eq!(requests[0].field_context.label_text, "Email");
    assert_eq!(requests[0].field_context.field_type, "email");
    assert_eq!(requests[0].field_context.name, "subscribe");
}

#[tokio::test]
async fn hidden_field_is_not_requested() {
    let client = Arc::new(StaticGuidanceClient::new(email_record()));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());
    let mut page = newsletter_page();
    page.nodes[1].style = hidden_style();

    let report = scanner.scan(&page).await;
    assert_eq!(report.candidates, 0);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn field_revealed_later_is_picked_up() {
    let client = Arc::new(StaticGuidanceClient::new(email_record()));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());
    let mut page = newsletter_page();
    page.nodes[3].hidden = true;

    assert_eq!(scanner.scan(&page).await.attached(), 0);

    page.nodes[3].hidden = false;
    assert_eq!(scanner.scan(&page).await.attached(), 1);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn disabled_settings_skip_scanning() {
    let client = Arc::new(StaticGuidanceClient::new(email_record()));
    let settings = ScanSettings {
        enabled: false,
        ..Default::default()
    };
    let mut scanner = scanner_with(client.clone(), settings);

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.candidates, 0);
    assert!(report.tooltips.is_empty());
    assert_eq!(client.calls(), 0);
}

// =========================================================================
// Page mutations between passes
// =========================================================================

#[tokio::test]
async fn field_inserted_ahead_gets_guidance_and_attached_field_is_kept() {
    let client = Arc::new(RecordingClient::default());
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    let first = scanner.scan(&newsletter_page()).await;
    assert_eq!(first.tooltips.iter().map(|t| t.node).collect::<Vec<_>>(), vec![3]);

    // Phone label and input now sit at 2 and 3, Email moved to 5.
    let mutated = newsletter_page_with_phone();
    let second = scanner.scan(&mutated).await;

    assert_eq!(second.candidates, 1);
    assert_eq!(second.attached(), 1);
    assert_eq!(second.tooltips[0].node, 3);
    assert_eq!(second.tooltips[0].label, "Phone");
    assert!(scanner.is_attached(&mutated, 3));
    assert!(scanner.is_attached(&mutated, 5));
    assert_eq!(scanner.attached_count(), 2);

    let labels: Vec<String> = client
        .requests
        .lock()
        .iter()
        .map(|r| r.field_context.label_text.clone())
        .collect();
    assert_eq!(labels, vec!["Email".to_string(), "Phone".to_string()]);
}

#[tokio::test]
async fn removed_field_does_not_shift_markers() {
    let client = Arc::new(RecordingClient::default());
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    scanner.scan(&newsletter_page_with_phone()).await;
    assert_eq!(scanner.attached_count(), 2);

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.candidates, 0);
    assert_eq!(client.requests.lock().len(), 2);
}

#[tokio::test]
async fn extractor_uid_follows_relabelled_field() {
    let client = Arc::new(RecordingClient::default());
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());
    let mut page = newsletter_page();
    page.nodes[3].uid = Some("el-42".into());

    scanner.scan(&page).await;

    page.nodes[2] = text(node("label", Some(1)), "E-mail address");
    page.nodes[2].html_for = Some("subscribe-email".into());
    let report = scanner.scan(&page).await;

    assert_eq!(report.candidates, 0);
    assert!(scanner.is_attached(&page, 3));
    assert_eq!(client.requests.lock().len(), 1);
}

// =========================================================================
// Shared fingerprints
// =========================================================================

#[tokio::test(start_paused = true)]
async fn radio_group_fetches_once_and_fills_in_on_rescan() {
    let client =
        Arc::new(StaticGuidanceClient::new(contact_record()).with_delay(Duration::from_millis(50)));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());
    let page = radio_group_page();

    let first = scanner.scan(&page).await;
    assert_eq!(first.candidates, 3);
    assert_eq!(first.fetched, 1);
    assert_eq!(first.skipped_in_flight, 2);
    assert_eq!(first.tooltips.iter().map(|t| t.node).collect::<Vec<_>>(), vec![3]);

    let second = scanner.scan(&page).await;
    assert_eq!(second.candidates, 2);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.tooltips.iter().map(|t| t.node).collect::<Vec<_>>(), vec![5, 7]);
    assert!(second.tooltips.iter().all(|t| t.record == contact_record()));

    assert_eq!(scanner.attached_count(), 3);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn immediate_answer_serves_radio_group_from_cache() {
    let client = Arc::new(StaticGuidanceClient::new(contact_record()));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    let report = scanner.scan(&radio_group_page()).await;
    assert_eq!(report.fetched, 1);
    assert_eq!(report.cache_hits, 2);
    assert_eq!(report.attached(), 3);
    assert_eq!(client.calls(), 1);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn failed_fetch_attaches_nothing_and_retries() {
    let client = Arc::new(StaticGuidanceClient::failing(GuidanceError::RelayStatus {
        status: 500,
        body: String::new(),
    }));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    let first = scanner.scan(&newsletter_page()).await;
    assert_eq!(first.failed, 1);
    assert!(first.tooltips.is_empty());
    assert!(!scanner.is_attached(&newsletter_page(), 3));

    let second = scanner.scan(&newsletter_page()).await;
    assert_eq!(second.failed, 1);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn fallback_attaches_generic_record_on_failure() {
    let client =
        Arc::new(StaticGuidanceClient::failing(GuidanceError::Transport("offline".into())));
    let settings = ScanSettings {
        fallback_on_failure: true,
        ..Default::default()
    };
    let mut scanner = scanner_with(client, settings);

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.attached(), 1);
    assert_eq!(report.tooltips[0].record.explanation, FALLBACK_EXPLANATION);
}

#[tokio::test]
async fn empty_explanation_is_not_attached() {
    let client = Arc::new(StaticGuidanceClient::with_payload(GuidanceParseResult::Degraded(
        GuidanceRecord::default(),
    )));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.degraded, 1);
    assert!(report.tooltips.is_empty());

    scanner.scan(&newsletter_page()).await;
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn unparseable_reply_becomes_explanation() {
    let client = Arc::new(StaticGuidanceClient::with_payload(GuidanceParseResult::Unparseable(
        "Enter the email you check most often.".into(),
    )));
    let mut scanner = scanner_with(client, ScanSettings::default());

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.degraded, 1);
    assert_eq!(
        report.tooltips[0].record.explanation,
        "Enter the email you check most often."
    );
}

// =========================================================================
// Navigation
// =========================================================================

#[tokio::test]
async fn navigate_starts_a_fresh_session() {
    let client = Arc::new(StaticGuidanceClient::new(email_record()));
    let mut scanner = scanner_with(client.clone(), ScanSettings::default());

    scanner.scan(&newsletter_page()).await;
    let old_session = scanner.session().clone();

    scanner.navigate();
    assert!(old_session.is_disposed());
    assert!(!scanner.session().is_disposed());
    assert_eq!(scanner.attached_count(), 0);

    let report = scanner.scan(&newsletter_page()).await;
    assert_eq!(report.pass, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(client.calls(), 2);
}

// =========================================================================
// Trace log
// =========================================================================

#[tokio::test]
async fn trace_log_records_each_decision() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.jsonl");
    let tracer = TraceLogger::new(path.to_str().unwrap());
    assert!(tracer.is_enabled());

    let client = Arc::new(StaticGuidanceClient::new(contact_record()));
    let mut scanner = scanner_with(client, ScanSettings::default()).with_tracer(tracer);
    scanner.scan(&radio_group_page()).await;

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["outcome"], "fetched");
    assert_eq!(events[1]["outcome"], "cached");
    assert_eq!(events[0]["fingerprint"], "en-US::radio_contact__Contact");
    assert_eq!(events[0]["element"], "input|radio|contact||Contact#0");
    assert_eq!(events[2]["element"], "input|radio|contact||Contact#2");
    assert!(events.iter().all(|e| e["attached"] == true && e["pass"] == 1));
}

#[test]
fn unwritable_trace_path_disables_logging() {
    let tracer = TraceLogger::new("/nonexistent-dir/scan.jsonl");
    assert!(!tracer.is_enabled());
}

// =========================================================================
// Tooltip rendering
// =========================================================================

#[test]
fn tooltip_html_sections() {
    let html = render_tooltip(&email_record().with_caution("We never share it."));
    assert!(html.starts_with("<div class=\"form-guidance-tooltip\">"));
    assert!(html.contains("<div class=\"fg-expl\">Enter a valid email address.</div>"));
    assert!(html.contains("<div class=\"fg-hint\"><b>Format:</b> user@domain.tld</div>"));
    assert!(html.contains("<div class=\"fg-examples\"><b>Examples:</b> name@example.com</div>"));
    assert!(html.contains("<div class=\"fg-caution\"><b>Note:</b> We never share it.</div>"));
}

#[test]
fn tooltip_omits_empty_sections() {
    let html = render_tooltip(&GuidanceRecord::new("Your city."));
    assert!(!html.contains("fg-hint"));
    assert!(!html.contains("fg-examples"));
    assert!(!html.contains("fg-caution"));
}

#[test]
fn tooltip_uses_default_explanation_when_blank() {
    let html = render_tooltip(&GuidanceRecord::default().with_format_hint("DD/MM/YYYY"));
    assert!(html.contains("Helpful info for this field."));
}

#[test]
fn tooltip_escapes_model_text() {
    let record = GuidanceRecord::new("<script>alert('x')</script>")
        .with_examples(["a & b", "\"quoted\""]);
    let html = render_tooltip(&record);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    assert!(html.contains("a &amp; b, &quot;quoted&quot;"));
}

#[test]
fn tooltip_plain_text() {
    let tooltip = Tooltip::new(3, "Email", email_record());
    assert_eq!(
        format_tooltip_text(&tooltip),
        "[3] Email\n  Enter a valid email address.\n  Format: user@domain.tld\n  Examples: name@example.com\n"
    );
}

use crate::guidance::guidance_model::GuidanceRecord;

const DEFAULT_EXPLANATION: &str = "Helpful info for this field.";

/// A tooltip attached to one page node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub node: usize,
    pub label: String,
    pub record: GuidanceRecord,
    pub html: String,
}

impl Tooltip {
    pub fn new(node: usize, label: &str, record: GuidanceRecord) -> Self {
        let html = render_tooltip(&record);
        Self {
            node,
            label: label.to_string(),
            record,
            html,
        }
    }
}

/// Render the tooltip body. Every piece of model text is escaped.
pub fn render_tooltip(record: &GuidanceRecord) -> String {
    let explanation = if record.explanation.trim().is_empty() {
        DEFAULT_EXPLANATION
    } else {
        record.explanation.as_str()
    };

    let mut html = String::from("<div class=\"form-guidance-tooltip\">\n");
    html.push_str(&format!(
        "  <div class=\"fg-expl\">{}</div>\n",
        escape_html(explanation)
    ));

    if !record.format_hint.is_empty() {
        html.push_str(&format!(
            "  <div class=\"fg-hint\"><b>Format:</b> {}</div>\n",
            escape_html(&record.format_hint)
        ));
    }

    if !record.examples.is_empty() {
        html.push_str(&format!(
            "  <div class=\"fg-examples\"><b>Examples:</b> {}</div>\n",
            escape_html(&record.examples.join(", "))
        ));
    }

    if !record.caution.is_empty() {
        html.push_str(&format!(
            "  <div class=\"fg-caution\"><b>Note:</b> {}</div>\n",
            escape_html(&record.caution)
        ));
    }

    html.push_str("</div>");
    html
}

/// Plain-text variant for terminal output.
pub fn format_tooltip_text(tooltip: &Tooltip) -> String {
    let record = &tooltip.record;
    let mut out = format!("[{}] {}\n  {}\n", tooltip.node, tooltip.label, record.explanation);
    if !record.format_hint.is_empty() {
        out.push_str(&format!("  Format: {}\n", record.format_hint));
    }
    if !record.examples.is_empty() {
        out.push_str(&format!("  Examples: {}\n", record.examples.join(", ")));
    }
    if !record.caution.is_empty() {
        out.push_str(&format!("  Note: {}\n", record.caution));
    }
    out
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::field::{fingerprint::FieldFingerprint, identity::ElementKey};
use crate::guidance::session::GuidanceOutcome;

/// One scanner decision for one field.
#[derive(Debug, Serialize)]
pub struct ScanEvent {
    pub timestamp_ms: u128,
    pub pass: u64,
    pub node: usize,
    pub element: String,
    pub fingerprint: String,

    pub outcome: String,
    pub detail: Option<String>,
    pub attached: bool,
}

impl ScanEvent {
    pub fn now(pass: u64, node: usize, fingerprint: &FieldFingerprint) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            pass,
            node,
            element: String::new(),
            fingerprint: fingerprint.to_string(),
            outcome: String::new(),
            detail: None,
            attached: false,
        }
    }

    pub fn with_element(mut self, key: &ElementKey) -> Self {
        self.element = key.to_string();
        self
    }

    pub fn with_outcome(mut self, outcome: &GuidanceOutcome) -> Self {
        self.outcome = outcome.label().to_string();
        if let GuidanceOutcome::Failed(err) = outcome {
            self.detail = Some(err.to_string());
        }
        self
    }

    pub fn with_attached(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

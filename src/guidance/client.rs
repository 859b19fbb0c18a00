use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::guidance::error::GuidanceError;
use crate::guidance::guidance_model::{GuidanceParseResult, GuidanceRecord, GuidanceRequest};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000/guidance";

/// Sends a field context to the relay and resolves the reply.
#[async_trait]
pub trait GuidanceClient: Send + Sync {
    async fn fetch(&self, request: &GuidanceRequest) -> Result<GuidanceParseResult, GuidanceError>;
}

// ============================================================================
// HTTP client
// ============================================================================

pub struct HttpGuidanceClient {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpGuidanceClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpGuidanceClient {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

#[async_trait]
impl GuidanceClient for HttpGuidanceClient {
    async fn fetch(&self, request: &GuidanceRequest) -> Result<GuidanceParseResult, GuidanceError> {
        debug!(
            endpoint = %self.endpoint,
            language = %request.user_language,
            "sending guidance request"
        );

        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "guidance response received");

        if !status.is_success() {
            return Err(GuidanceError::RelayStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_relay_body(&body)
    }
}

/// Interpret a 2xx relay body.
pub fn parse_relay_body(body: &str) -> Result<GuidanceParseResult, GuidanceError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if !map.contains_key("explanation") && map.contains_key("error") => {
            let message = match &map["error"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(GuidanceError::Relay(message))
        }
        Ok(value) => Ok(GuidanceParseResult::from(value)),
        Err(_) => Ok(GuidanceParseResult::Unparseable(body.to_string())),
    }
}

// ============================================================================
// Static client (offline use and tests)
// ============================================================================

/// Answers every request with the same payload, optionally after a delay.
pub struct StaticGuidanceClient {
    response: Result<GuidanceParseResult, GuidanceError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticGuidanceClient {
    pub fn new(record: GuidanceRecord) -> Self {
        Self::with_payload(GuidanceParseResult::Valid(record))
    }

    pub fn with_payload(payload: GuidanceParseResult) -> Self {
        Self {
            response: Ok(payload),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GuidanceError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuidanceClient for StaticGuidanceClient {
    async fn fetch(
        &self,
        _request: &GuidanceRequest,
    ) -> Result<GuidanceParseResult, GuidanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

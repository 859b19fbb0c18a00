//! Guidance relay: forwards field context to a hosted model and returns
//! normalized guidance JSON.
//!
//! ```text
//! GET  /          - status page
//! POST /guidance  - field context in, GuidanceRecord out
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::guidance::guidance_model::{GuidanceRecord, GuidanceRequest};
use crate::relay::backend::ChatBackend;
use crate::relay::error::RelayError;
use crate::relay::prompt::{DEFAULT_TEMPERATURE, build_messages, parse_model_reply};

/// Relay listen address.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Clone)]
pub struct RelayState {
    pub backend: Arc<dyn ChatBackend>,
    pub temperature: f32,
}

impl RelayState {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/guidance", post(guidance))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Ask the backend about one field and normalize its reply.
pub async fn handle_guidance(
    state: &RelayState,
    request: &GuidanceRequest,
) -> Result<GuidanceRecord, RelayError> {
    let messages = build_messages(request);
    let reply = state.backend.complete(&messages, state.temperature).await?;
    Ok(parse_model_reply(&reply))
}

async fn guidance(
    State(state): State<RelayState>,
    Json(request): Json<GuidanceRequest>,
) -> (StatusCode, Json<GuidanceRecord>) {
    info!(
        domain = %request.page_domain,
        language = %request.user_language,
        field_type = %request.field_context.field_type,
        "guidance request"
    );

    match handle_guidance(&state, &request).await {
        Ok(record) => (StatusCode::OK, Json(record)),
        Err(e) => {
            error!(backend = state.backend.name(), error = %e, "guidance relay failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(GuidanceRecord::fallback()))
        }
    }
}

async fn status_page(State(state): State<RelayState>) -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>FormSaathi API</title>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #f4f4fb; display: flex; justify-content: center; padding: 40px; }}
  .container {{ background: white; border-radius: 16px; padding: 40px; max-width: 600px; text-align: center; }}
  h1 {{ color: #667eea; }}
  .status {{ display: inline-block; background: #d4edda; color: #155724; padding: 8px 16px; border-radius: 20px; font-weight: 600; }}
  pre {{ text-align: left; background: #f8f9fa; padding: 16px; border-radius: 8px; }}
</style>
</head>
<body>
<div class="container">
  <h1>FormSaathi API</h1>
  <div class="status">Backend Running Successfully</div>
  <p>Multilingual form guidance relay (model backend: {backend})</p>
  <p><code>POST /guidance</code></p>
  <pre>{{
  "page_domain": "example.com",
  "user_language": "hi-IN",
  "field_context": {{
    "label_text": "Email",
    "type": "email"
  }}
}}</pre>
  <p>FormSaathi Backend &bull; Version {version}</p>
</div>
</body>
</html>
"##,
        backend = state.backend.name(),
        version = env!("CARGO_PKG_VERSION"),
    ))
}

pub struct RelayServer {
    config: RelayConfig,
    state: RelayState,
}

impl RelayServer {
    pub fn new(config: RelayConfig, state: RelayState) -> Self {
        Self { config, state }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Serve until Ctrl-C.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let app = create_router(self.state.clone());

        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!(backend = self.state.backend.name(), "Guidance relay listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;

        Ok(())
    }
}

use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::config::{AppConfig, AzureConfig, OllamaConfig, build_scan_settings};
use crate::field::field_model::{FieldContext, PageSnapshot};
use crate::guidance::client::{GuidanceClient, HttpGuidanceClient};
use crate::guidance::guidance_model::{GuidanceRecord, GuidanceRequest};
use crate::guidance::session::GuidanceSession;
use crate::relay::backend::{AzureOpenAiBackend, ChatBackend, MockChatBackend, OllamaBackend};
use crate::relay::error::RelayError;
use crate::relay::server::{RelayConfig, RelayServer, RelayState};
use crate::scan::scanner::PageScanner;
use crate::scan::tooltip::{Tooltip, format_tooltip_text};
use crate::trace::logger::TraceLogger;

// ============================================================================
// serve subcommand
// ============================================================================

/// Relay options after merging CLI flags into the config file.
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub provider: Option<String>,
    pub azure: AzureConfig,
    pub ollama: OllamaConfig,
}

pub async fn cmd_serve(
    config: &AppConfig,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = options
        .provider
        .unwrap_or_else(|| config.relay.provider.clone());
    let backend = build_backend(&provider, &options.azure, &options.ollama)?;

    let relay_config = RelayConfig::new(
        options.host.unwrap_or_else(|| config.relay.host.clone()),
        options.port.unwrap_or(config.relay.port),
    );
    let state = RelayState::new(backend).with_temperature(config.relay.temperature);

    RelayServer::new(relay_config, state).run().await
}

/// Construct the model backend named by `provider`.
pub fn build_backend(
    provider: &str,
    azure: &AzureConfig,
    ollama: &OllamaConfig,
) -> Result<Arc<dyn ChatBackend>, RelayError> {
    match provider {
        "azure" => {
            let endpoint = azure.endpoint.as_deref().unwrap_or("");
            let deployment = azure.deployment.as_deref().unwrap_or("");
            let api_key = azure.api_key.as_deref().unwrap_or("");
            if endpoint.is_empty() || deployment.is_empty() || api_key.is_empty() {
                warn!(
                    "Azure OpenAI settings incomplete; guidance requests will return the fallback"
                );
            }

            let mut backend = AzureOpenAiBackend::new(endpoint, deployment, api_key);
            if let Some(version) = azure.api_version.as_deref() {
                backend = backend.with_api_version(version);
            }
            Ok(Arc::new(backend))
        }
        "ollama" => {
            let defaults = OllamaBackend::default();
            Ok(Arc::new(OllamaBackend::new(
                ollama.endpoint.as_deref().unwrap_or(&defaults.endpoint),
                ollama.model.as_deref().unwrap_or(&defaults.model),
            )))
        }
        "mock" => Ok(Arc::new(MockChatBackend::default())),
        other => Err(RelayError::NotConfigured(format!(
            "unknown provider '{}' (expected azure, ollama or mock)",
            other
        ))),
    }
}

/// Resolve Azure settings: CLI/env > config file.
pub fn merge_azure(
    config: &AzureConfig,
    endpoint: Option<String>,
    deployment: Option<String>,
    api_key: Option<String>,
) -> AzureConfig {
    AzureConfig {
        endpoint: endpoint.or_else(|| config.endpoint.clone()),
        deployment: deployment.or_else(|| config.deployment.clone()),
        api_key: api_key.or_else(|| config.api_key.clone()),
        api_version: config.api_version.clone(),
    }
}

// ============================================================================
// scan subcommand
// ============================================================================

pub struct ScanOptions {
    pub snapshot: String,
    pub backend_url: Option<String>,
    pub language: Option<String>,
    pub rescans: u32,
    pub trace: Option<String>,
    pub fallback: bool,
}

/// Scan a snapshot against the relay, printing every tooltip attached.
pub async fn cmd_scan(
    config: &AppConfig,
    options: ScanOptions,
    verbose: u8,
) -> Result<Vec<Tooltip>, Box<dyn std::error::Error>> {
    let page = PageSnapshot::load(&options.snapshot)?;
    let backend_url = options
        .backend_url
        .clone()
        .unwrap_or_else(|| config.extension.backend_url.clone());
    let client: Arc<dyn GuidanceClient> = Arc::new(HttpGuidanceClient::new(&backend_url));

    let tooltips = scan_page(config, &page, client, &options).await;

    for tooltip in &tooltips {
        if verbose > 0 {
            println!("{}", tooltip.html);
        }
        print!("{}", format_tooltip_text(tooltip));
    }
    println!("Attached guidance to {} fields", tooltips.len());

    Ok(tooltips)
}

/// Run the first pass plus `options.rescans` follow-up passes.
pub async fn scan_page(
    config: &AppConfig,
    page: &PageSnapshot,
    client: Arc<dyn GuidanceClient>,
    options: &ScanOptions,
) -> Vec<Tooltip> {
    let settings = build_scan_settings(
        &config.extension,
        options.language.as_deref(),
        options.fallback,
    );
    let session = GuidanceSession::new(config.session.to_session_config());
    let tracer = match &options.trace {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    let mut scanner = PageScanner::new(session, client, settings).with_tracer(tracer);

    let mut tooltips = Vec::new();
    for _ in 0..=options.rescans {
        let report = scanner.scan(page).await;
        let pending = report.candidates.saturating_sub(report.attached());
        tooltips.extend(report.tooltips);
        if pending == 0 {
            break;
        }
        info!(pending, "rescanning for fields without guidance");
    }

    scanner.session().dispose();
    tooltips
}

// ============================================================================
// probe subcommand
// ============================================================================

pub struct ProbeOptions {
    pub backend_url: Option<String>,
    pub label: String,
    pub field_type: String,
    pub placeholder: Option<String>,
    pub language: Option<String>,
    pub domain: String,
}

pub fn build_probe_request(config: &AppConfig, options: &ProbeOptions) -> GuidanceRequest {
    GuidanceRequest {
        page_domain: options.domain.clone(),
        user_language: options
            .language
            .clone()
            .unwrap_or_else(|| config.extension.user_language.clone()),
        field_context: FieldContext {
            label_text: options.label.clone(),
            field_type: options.field_type.clone(),
            placeholder: options.placeholder.clone(),
            ..Default::default()
        },
    }
}

pub async fn cmd_probe(
    config: &AppConfig,
    options: ProbeOptions,
) -> Result<GuidanceRecord, Box<dyn std::error::Error>> {
    let backend_url = options
        .backend_url
        .clone()
        .unwrap_or_else(|| config.extension.backend_url.clone());
    let request = build_probe_request(config, &options);
    let client = HttpGuidanceClient::new(&backend_url);

    println!("Testing: {}", client.endpoint());
    let record = client.fetch(&request).await?.into_record();
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(record)
}

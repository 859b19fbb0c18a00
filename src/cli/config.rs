use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::guidance::client::DEFAULT_BACKEND_URL;
use crate::guidance::session::{DEFAULT_FETCH_TIMEOUT, InFlightPolicy, SessionConfig};
use crate::relay::prompt::DEFAULT_TEMPERATURE;
use crate::scan::scanner::{DEFAULT_LANGUAGE, ScanSettings};

pub const DEFAULT_CONFIG_PATH: &str = "formsaathi.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "formsaathi",
    version,
    about = "AI-generated guidance for web form fields"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: formsaathi.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the guidance relay
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Model backend: azure, ollama or mock
        #[arg(long)]
        provider: Option<String>,

        /// Azure OpenAI resource endpoint
        #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
        azure_endpoint: Option<String>,

        /// Azure OpenAI deployment name
        #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT")]
        azure_deployment: Option<String>,

        /// Azure OpenAI API key
        #[arg(long, env = "AZURE_OPENAI_API_KEY", hide_env_values = true)]
        azure_api_key: Option<String>,

        /// Ollama API endpoint
        #[arg(long)]
        ollama_endpoint: Option<String>,

        /// Ollama model name
        #[arg(long)]
        ollama_model: Option<String>,
    },

    /// Scan a page snapshot and attach guidance to its fields
    Scan {
        /// Page snapshot JSON file
        #[arg(long)]
        snapshot: String,

        /// Relay guidance URL
        #[arg(long, env = "FORMSAATHI_BACKEND_URL")]
        backend_url: Option<String>,

        /// User language tag (e.g. en-US, hi-IN)
        #[arg(long)]
        language: Option<String>,

        /// Extra passes after the first, picking up skipped fields
        #[arg(long, default_value_t = 1)]
        rescans: u32,

        /// Append scan decisions as JSON lines to this file
        #[arg(long)]
        trace: Option<String>,

        /// Show the generic fallback text when a fetch fails
        #[arg(long)]
        fallback: bool,
    },

    /// Send one guidance request to the relay and print the reply
    Probe {
        /// Relay guidance URL
        #[arg(long, env = "FORMSAATHI_BACKEND_URL")]
        backend_url: Option<String>,

        /// Field label
        #[arg(long, default_value = "Email Address")]
        label: String,

        /// Field type
        #[arg(long = "type", default_value = "email")]
        field_type: String,

        /// Field placeholder
        #[arg(long)]
        placeholder: Option<String>,

        /// User language tag
        #[arg(long)]
        language: Option<String>,

        /// Page domain
        #[arg(long, default_value = "example.com")]
        domain: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `formsaathi.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub relay: RelayFileConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub extension: ExtensionConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayFileConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for RelayFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            provider: default_provider(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzureConfig {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

/// Settings the extension's options page stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default = "default_language")]
    pub user_language: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_backend_url")]
    pub backend_url: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            user_language: default_language(),
            enabled: true,
            backend_url: default_backend_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFileConfig {
    /// 0 disables the timeout
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    pub cache_ttl_secs: Option<u64>,

    pub max_entries: Option<usize>,

    #[serde(default)]
    pub in_flight: InFlightPolicy,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            cache_ttl_secs: None,
            max_entries: None,
            in_flight: InFlightPolicy::Skip,
        }
    }
}

// Serde default helpers
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_provider() -> String { "azure".to_string() }
fn default_temperature() -> f32 { DEFAULT_TEMPERATURE }
fn default_language() -> String { DEFAULT_LANGUAGE.to_string() }
fn default_true() -> bool { true }
fn default_backend_url() -> String { DEFAULT_BACKEND_URL.to_string() }
fn default_fetch_timeout_ms() -> u64 { DEFAULT_FETCH_TIMEOUT.as_millis() as u64 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl SessionFileConfig {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            fetch_timeout: (self.fetch_timeout_ms > 0)
                .then(|| Duration::from_millis(self.fetch_timeout_ms)),
            cache_ttl: self.cache_ttl_secs.map(Duration::from_secs),
            max_entries: self.max_entries,
            in_flight: self.in_flight,
        }
    }
}

/// Build scanner settings: CLI > config > defaults.
pub fn build_scan_settings(
    config: &ExtensionConfig,
    language: Option<&str>,
    fallback_on_failure: bool,
) -> ScanSettings {
    ScanSettings {
        user_language: language.unwrap_or(&config.user_language).to_string(),
        enabled: config.enabled,
        fallback_on_failure,
    }
}

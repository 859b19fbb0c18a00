use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::relay::error::RelayError;
use crate::relay::prompt::ChatMessage;

pub const AZURE_API_VERSION: &str = "2025-01-01-preview";

/// A hosted language model that answers a chat transcript with text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, RelayError>;
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Upstream {
        status: status.as_u16(),
        body,
    })
}

// ============================================================================
// Azure OpenAI Backend
// ============================================================================

pub struct AzureOpenAiBackend {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AzureOpenAiBackend {
    pub fn new(endpoint: &str, deployment: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            deployment: deployment.to_string(),
            api_key: api_key.to_string(),
            api_version: AZURE_API_VERSION.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.to_string();
        self
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl ChatBackend for AzureOpenAiBackend {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, RelayError> {
        if self.endpoint.is_empty() || self.deployment.is_empty() {
            return Err(RelayError::NotConfigured(
                "AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_DEPLOYMENT are required".to_string(),
            ));
        }

        let url = self.completions_url();
        debug!(deployment = %self.deployment, "calling azure chat completions");

        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&ChatCompletionRequest {
                messages,
                temperature,
            })
            .send()
            .await?;

        let body = ensure_success(response).await?.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| RelayError::BadResponse(e.to_string()))?;

        // A reply without content is treated like an empty JSON object.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    http: reqwest::Client,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new("http://localhost:11434/api/generate", "qwen2.5:1.5b")
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// `/api/generate` takes a single prompt, so the turns are concatenated.
    fn build_prompt(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, RelayError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(messages),
            stream: false,
            format: "json",
            options: OllamaOptions { temperature },
        };

        debug!(model = %self.model, "calling ollama generate");
        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let body = ensure_success(response).await?.text().await?;
        let parsed: OllamaResponse =
            serde_json::from_str(&body).map_err(|e| RelayError::BadResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}

// ============================================================================
// Mock Backend (for testing without a model)
// ============================================================================

/// Returns the same reply for every transcript.
pub struct MockChatBackend {
    pub reply: String,
}

impl MockChatBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
        }
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new(
            r#"{"explanation":"Enter the information this field asks for.","examples":[],"format_hint":"","caution":""}"#,
        )
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, RelayError> {
        Ok(self.reply.clone())
    }
}

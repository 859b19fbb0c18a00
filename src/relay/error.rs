use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Backend is missing a required setting (endpoint, deployment, key)
    #[error("Relay backend not configured: {0}")]
    NotConfigured(String),

    /// HTTP call to the model provider failed
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Model provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Provider answer did not have the expected shape
    #[error("Unexpected model response: {0}")]
    BadResponse(String),
}

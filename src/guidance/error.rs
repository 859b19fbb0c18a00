use std::time::Duration;

use thiserror::Error;

/// Why a guidance fetch produced no record.
///
/// None of these are fatal: the scanner shows no tooltip for the field
/// this pass and a later rescan may retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuidanceError {
    /// Request never reached the relay or the body could not be read
    #[error("Transport error: {0}")]
    Transport(String),

    /// Relay answered with a non-success status
    #[error("Relay returned {status}: {body}")]
    RelayStatus { status: u16, body: String },

    /// Relay answered 2xx but reported an error in the body
    #[error("Relay reported error: {0}")]
    Relay(String),

    /// Fetch exceeded the session timeout
    #[error("Guidance fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Fetch aborted through its cancellation token
    #[error("Guidance fetch cancelled")]
    Cancelled,

    /// Session already disposed
    #[error("Guidance session disposed")]
    Disposed,

    /// Joined an in-flight fetch that ended without a record
    #[error("In-flight fetch for {0} ended without a record")]
    JoinedFetchFailed(String),
}

impl From<reqwest::Error> for GuidanceError {
    fn from(err: reqwest::Error) -> Self {
        GuidanceError::Transport(err.to_string())
    }
}

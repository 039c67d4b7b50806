// src/error.rs
// Error taxonomy for the relay

use thiserror::Error;

/// Main error type for the relay library
#[derive(Error, Debug)]
pub enum RelayError {
    /// Unsupported provider selection or unusable settings. Raised at
    /// construction time, before any stage starts.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller failed the bearer-key check
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{provider} API error {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Result using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<reqwest_eventsource::Error> for RelayError {
    fn from(err: reqwest_eventsource::Error) -> Self {
        match err {
            reqwest_eventsource::Error::Transport(e) => RelayError::Http(e),
            other => RelayError::Stream(other.to_string()),
        }
    }
}

//! Error types for the analysis gateway.

use thiserror::Error;

/// Errors that can occur while talking to the analysis service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("analysis service returned status {0}")]
    Status(u16),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Model output could not be turned into the expected structure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Model returned an empty reply.
    #[error("empty response from analysis service")]
    EmptyResponse,

    /// Input cannot be sent (empty image, unreadable payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The gateway implementation panicked while serving the request.
    #[error("analysis gateway panicked")]
    Panicked,
}

impl GatewayError {
    /// Check if this error is transient.
    ///
    /// The orchestrator never retries; this only classifies failures in logs.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::HttpRequest(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/*
[INPUT]:  Error sources (HTTP, API, serialization, auth, WebSocket, model mapping)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the Coinbase Advanced Trade adapter
#[derive(Error, Debug)]
pub enum CoinbaseError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Authentication failed or credentials are unusable
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// WebSocket is not open
    #[error("WebSocket not connected")]
    NotConnected,

    /// Channel name outside the supported set
    #[error("Unknown channel type: {0}")]
    InvalidChannel(String),

    /// A wire field could not be mapped to its typed value
    #[error("Cannot decode field `{field}` from value {value:?}")]
    Decode { field: &'static str, value: String },

    /// Caller input rejected before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    /// Connection timeout
    #[error("Connection timeout after {duration}s")]
    Timeout { duration: u64 },
}

impl CoinbaseError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoinbaseError::Http(_)
                | CoinbaseError::RateLimit { .. }
                | CoinbaseError::Timeout { .. }
                | CoinbaseError::WebSocket(_)
                | CoinbaseError::NotConnected
                | CoinbaseError::InvalidResponse(_)
        )
    }

    /// Get retry delay in seconds (if retryable)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            CoinbaseError::RateLimit { retry_after } => Some(*retry_after),
            CoinbaseError::Timeout { .. } => Some(1),
            _ => None,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            CoinbaseError::Authentication { .. } => true,
            CoinbaseError::Api { code, .. } => *code == 401 || *code == 403,
            _ => false,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        CoinbaseError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }

    pub(crate) fn decode(field: &'static str, value: impl Into<String>) -> Self {
        CoinbaseError::Decode {
            field,
            value: value.into(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CoinbaseError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        CoinbaseError::WebSocket(err.to_string())
    }
}

impl From<serde_yaml::Error> for CoinbaseError {
    fn from(err: serde_yaml::Error) -> Self {
        CoinbaseError::Config(err.to_string())
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, CoinbaseError>;

/*
[INPUT]:  Error sources (HTTP, API, serialization, WebSocket, validation)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Main error type for the Birdeye adapter
#[derive(Error, Debug)]
pub enum BirdeyeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// API key missing, invalid or lacking permission
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket transport error on an established connection
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// WebSocket handshake failed
    #[error("failed to connect to websocket: {source}, http status code: {}", display_status(.status))]
    Connect {
        status: Option<u16>,
        #[source]
        source: tungstenite::Error,
    },

    /// No live WebSocket connection to write to
    #[error("WebSocket not connected")]
    NotConnected,

    /// `connect` called while a session is already running
    #[error("WebSocket already connected")]
    AlreadyConnected,

    /// Subscription request violates its category contract
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// REST request exceeded the configured client timeout
    #[error("Request timeout after {duration}s")]
    Timeout { duration: u64 },
}

impl BirdeyeError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BirdeyeError::Http(_)
                | BirdeyeError::RateLimit { .. }
                | BirdeyeError::Timeout { .. }
                | BirdeyeError::WebSocket(_)
                | BirdeyeError::Connect { .. }
                | BirdeyeError::NotConnected
        ) || matches!(self, BirdeyeError::Api { code, .. } if *code >= 500)
    }

    /// Get retry delay in seconds (if retryable)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            BirdeyeError::RateLimit { retry_after } => Some(*retry_after),
            BirdeyeError::Timeout { .. } => Some(1),
            BirdeyeError::Connect { .. } => Some(5),
            _ => None,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BirdeyeError::Authentication { .. })
            || matches!(self, BirdeyeError::Connect { status: Some(401 | 403), .. })
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        BirdeyeError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    pub(crate) fn connect(source: tungstenite::Error) -> Self {
        let status = match &source {
            tungstenite::Error::Http(response) => Some(response.status().as_u16()),
            _ => None,
        };
        BirdeyeError::Connect { status, source }
    }
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "n/a".to_string(), |code| code.to_string())
}

/// Result type alias for Birdeye operations
pub type Result<T> = std::result::Result<T, BirdeyeError>;

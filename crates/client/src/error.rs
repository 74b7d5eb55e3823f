//! Client error types
//!
//! Every failure surfaced by this crate is a [`ClientError`]: a message, an
//! HTTP status code (or [`NETWORK_ERROR_STATUS`] when no response arrived) and
//! the server-provided `detail`, tagged with an [`ErrorKind`]. Server error
//! bodies are only ever inspected in [`ClientError::from_response_parts`].

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the client
pub type Result<T> = std::result::Result<T, ClientError>;

/// Synthetic status code for failures where no HTTP response was received
pub const NETWORK_ERROR_STATUS: u16 = 0;

/// Generic message for transport-level failures
const NETWORK_ERROR_MESSAGE: &str = "Network request failed";

/// Error categories callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401 that could not be recovered by a token refresh. The session is over.
    AuthExpired,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// Any other 4xx
    Client,
    /// 5xx, or a non-success status outside the 4xx range
    Server,
    /// No response was obtained
    Network,
    /// A success response whose body was not the expected JSON
    Decode,
    /// Request data could not be serialized
    Encode,
    /// The client was configured with unusable settings
    Configuration,
}

impl ErrorKind {
    /// Classify a non-success HTTP status
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::AuthExpired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400..=499 => Self::Client,
            _ => Self::Server,
        }
    }
}

/// Normalized client error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    kind: ErrorKind,
    status_code: u16,
    message: String,
    detail: Option<String>,
}

impl ClientError {
    fn new(kind: ErrorKind, status_code: u16, message: String, detail: Option<String>) -> Self {
        Self {
            kind,
            status_code,
            message,
            detail,
        }
    }

    /// Normalize a non-success response from its status and raw body
    ///
    /// A JSON body with a `detail` field supplies the message; anything else
    /// falls back to the status text.
    pub fn from_response_parts(status: StatusCode, body: &[u8]) -> Self {
        let detail = extract_detail(body);
        let message = detail.clone().unwrap_or_else(|| status_text(status));
        Self::new(
            ErrorKind::from_status(status.as_u16()),
            status.as_u16(),
            message,
            detail,
        )
    }

    /// Normalize a non-success response, consuming its body
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        Self::from_response_parts(status, &body)
    }

    /// Transport failure: no response was received
    pub fn network(err: &reqwest::Error) -> Self {
        Self::new(
            ErrorKind::Network,
            NETWORK_ERROR_STATUS,
            NETWORK_ERROR_MESSAGE.to_string(),
            Some(err.to_string()),
        )
    }

    /// Caller-imposed deadline elapsed before a response arrived
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Network,
            NETWORK_ERROR_STATUS,
            NETWORK_ERROR_MESSAGE.to_string(),
            Some(format!("timed out after {}ms", after.as_millis())),
        )
    }

    /// A success response carried a body that could not be decoded
    pub fn decode(status: u16, err: &serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Decode,
            status,
            "Invalid response body".to_string(),
            Some(err.to_string()),
        )
    }

    /// Request data could not be serialized
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Encode,
            NETWORK_ERROR_STATUS,
            "Invalid request data".to_string(),
            Some(reason.into()),
        )
    }

    /// 401 raised locally, e.g. a refresh attempted without a refresh token
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::AuthExpired,
            StatusCode::UNAUTHORIZED.as_u16(),
            message.into(),
            None,
        )
    }

    /// Invalid client configuration
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Configuration,
            NETWORK_ERROR_STATUS,
            message.into(),
            None,
        )
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status, or [`NETWORK_ERROR_STATUS`] for local failures
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// The session can no longer be used; the user must log in again
    pub fn is_auth_expired(&self) -> bool {
        self.kind == ErrorKind::AuthExpired
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Whether repeating the call later might succeed. Nothing in this crate
    /// acts on it; retry policy belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Server)
    }
}

impl From<memboard_core::CoreError> for ClientError {
    fn from(err: memboard_core::CoreError) -> Self {
        Self::configuration(err.to_string())
    }
}

fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(detail) => Some(detail.clone()),
        // FastAPI validation errors carry a list of objects here
        other => Some(other.to_string()),
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

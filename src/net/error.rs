//! Transport error type.

use serde_json::Value;

/// Maximum number of error body characters surfaced as a message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Errors produced by [`super::ApiClient`] calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server could not be reached.
    #[error("unable to reach the server: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered 401 or 403.
    #[error("authentication rejected (status {status})")]
    Unauthorized { status: u16, message: Option<String> },

    /// The server answered with any other non-success status.
    #[error("request failed with status {status}")]
    Http { status: u16, message: Option<String> },

    /// A success response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client or request could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The stored token cannot be sent as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// HTTP status for errors that carry one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message extracted from the server's error body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message, .. } | Self::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// True for 401 and 403 responses.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True for transport failures and 5xx responses.
    #[must_use]
    pub fn is_server_side(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout | Self::Decode(_) | Self::ClientBuild(_) | Self::InvalidHeader(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Unauthorized { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::ClientBuild(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Pull a user-facing message out of an error body.
///
/// Prefers a JSON `message` string; otherwise the trimmed raw body, truncated.
#[must_use]
pub fn extract_server_message(body: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = map.get("message").and_then(Value::as_str) {
            let message = message.trim();
            if !message.is_empty() {
                return Some(message.to_owned());
            }
        }
        return None;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_MESSAGE_CHARS).collect())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

//! REST client error types.

use thiserror::Error;

/// Errors that can occur during REST API calls.
#[derive(Debug, Error)]
pub enum RestError {
    /// Non-success HTTP status with the response body.
    #[error("HTTP error: {status} - {body}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Raw response body, usually a JSON error object.
        body: String,
    },

    /// Request timed out.
    #[error("Request timeout")]
    Timeout,

    /// Connection error (network issue).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failed to parse response body as JSON.
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// Rate limited by the server (HTTP 418/429).
    #[error("Rate limited (HTTP {status})")]
    RateLimited {
        /// The status that signalled the limit.
        status: u16,
    },

    /// Failed to build the HTTP client or request.
    #[error("Request build error: {0}")]
    RequestBuild(String),
}

impl RestError {
    /// Body of an HTTP error response, if this is one.
    pub fn body(&self) -> Option<&str> {
        match self {
            RestError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, RestError::Timeout | RestError::Connection(_))
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RestError::Timeout
        } else if err.is_builder() {
            RestError::RequestBuild(err.to_string())
        } else if err.is_decode() {
            RestError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            RestError::HttpError {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RestError::Connection(err.to_string())
        }
    }
}

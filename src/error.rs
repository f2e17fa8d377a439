//! Adapter error types.

use thiserror::Error;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced by request dispatch.
///
/// Cancellation is not represented here: a cancelled request settles
/// successfully with an empty value and is never reported as an error.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network-level failure (connect, timeout, DNS). Surfaced verbatim.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response whose body exposes an `errors` field; that value
    /// is the rejection reason.
    #[error("server returned {status}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The `errors` value from the response body.
        errors: serde_json::Value,
    },

    /// Non-2xx response with no usable `errors` field. Carries the raw
    /// body, covering unparseable payloads uniformly.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// Base path + relative path did not form a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request could not be assembled (multipart part, header value).
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// The in-flight request task failed to complete.
    #[error("request dispatch failed: {0}")]
    Dispatch(String),
}

impl AdapterError {
    /// Get the HTTP status code if this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Get the server-provided `errors` value, if any.
    pub fn api_errors(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

//! Errors raised at the fetch boundary and their user-facing messages.
//!
//! Nothing in here is fatal: callers turn every variant into a message
//! string for an inline error panel or a toast.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No response was received (DNS, connect, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response whose body carries no data.
    #[error("response body was empty")]
    EmptyBody,

    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Rejected before any request was sent.
    #[error("invalid request: {0}")]
    Validation(&'static str),
}

impl ApiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => {
                "Could not reach the server. Please check your internet connection."
            }
            ApiError::Status { status, .. } => status_message(*status),
            ApiError::EmptyBody => "No weather data available.",
            ApiError::Parse(_) => "Received an unexpected response from the server.",
            ApiError::Validation(msg) => msg,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Validation failures would fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Validation(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

/// Maps an upstream HTTP status to the message shown to the user.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Invalid request. Please check your input.",
        401 => "Authorization failed. Please check your API key.",
        404 => "No results found.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "Server error. Please try again later.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Errors from durable client storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage key '{0}' contains unsupported characters")]
    InvalidKey(String),

    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

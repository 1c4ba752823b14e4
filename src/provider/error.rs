// ABOUTME: Error types for the provisioning API client.
// ABOUTME: Covers HTTP failures, envelope rejections, and polling outcomes.

use std::time::Duration;
use thiserror::Error;

use super::types::ResourceState;

#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a non-success status code.
    #[error("provider API returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: Option<String>,
    },

    #[error("provider request timed out")]
    Timeout,

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// A wrapped response reported `success: false`.
    #[error("provider rejected the request: {0}")]
    Rejected(String),

    #[error("order failed: {0}")]
    OrderFailed(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("resource {id} entered the error state")]
    ResourceError { id: String },

    #[error("timed out after {elapsed:?} waiting for resource {id} to become {target} (last seen: {last})")]
    WaitTimeout {
        id: String,
        target: ResourceState,
        last: String,
        elapsed: Duration,
    },
}

impl Error {
    /// Status code carried by an HTTP failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Typed failures of the fetch boundary
//!
//! Every variant is caught by the site modules and turned into "stop this
//! call, keep what was collected so far". None of them ever reaches the
//! chat user; they are only logged.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("Connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP error {status}: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("Anti-bot challenge not passed for {url} (marker: {marker})")]
    Challenge { url: String, marker: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

impl FetchError {
    /// Classify a reqwest failure into timeout vs. connection error
    pub fn from_reqwest(url: &str, timeout: Duration, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else {
            Self::Connection {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }

    pub fn http_status(status: u16, url: &str) -> Self {
        Self::HttpStatus {
            status,
            url: url.to_string(),
            retry_after_seconds: None,
        }
    }

    /// Only throttling and server-side statuses are worth another attempt
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => matches!(*status, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Server-requested delay before the next attempt
    pub const fn retry_delay_seconds(&self) -> Option<u64> {
        match self {
            Self::HttpStatus {
                retry_after_seconds, ..
            } => *retry_after_seconds,
            _ => None,
        }
    }
}

pub type FetchOutcome<T> = Result<T, FetchError>;

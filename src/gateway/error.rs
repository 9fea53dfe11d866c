//! Gateway error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Timeout, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Failed, message)
    }

    /// Classify a transport-level failure from the HTTP client
    pub fn from_transport(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::unavailable(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::unavailable(format!("Connection failed: {e}"))
        } else {
            Self::failed(format!("Request failed: {e}"))
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: &str) -> Self {
        match status {
            401 | 403 => Self::failed(format!("Authentication failed: {message}")),
            404 => Self::failed(format!("Not found: {message}")),
            429 => Self::unavailable(format!("Rate limit exceeded: {message}")),
            500..=599 => Self::unavailable(format!("Server error: {message}")),
            _ => Self::failed(format!("HTTP {status}: {message}")),
        }
    }
}

/// Error classification surfaced to the turn controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// The backing service cannot be reached (connect failure, 429, 5xx)
    Unavailable,
    /// No terminal state was reached within the bounded wait
    Timeout,
    /// Any non-recoverable response
    Failed,
}

impl GatewayErrorKind {
    /// Whether the poll loop may try the same request again before its deadline
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

//! Error types for Aisle.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AisleError {
    /// Malformed URL, empty query and similar caller mistakes.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external adapter (completion, embedding, search, fetch) failed.
    ///
    /// `status` is the HTTP status when the service answered, `None` when it
    /// could not be reached at all.
    #[error("{service} unavailable{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ServiceUnavailable {
        service: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("No final answer after {0} reasoning steps")]
    IterationBudgetExceeded(usize),

    #[error("Extraction failure: {0}")]
    ExtractionFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AisleError {
    /// Shorthand for a service that could not be reached.
    pub fn unreachable(service: impl Into<String>, message: impl ToString) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            status: None,
            message: message.to_string(),
        }
    }

    /// Shorthand for a service that answered with a non-success status.
    pub fn http_status(
        service: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures, timeouts, 429 and 5xx responses are transient;
    /// everything else (4xx, parse errors, bad input) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ServiceUnavailable { status: None, .. } => true,
            Self::ServiceUnavailable {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AisleError>;

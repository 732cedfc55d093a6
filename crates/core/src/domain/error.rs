// Domain Error Types

use thiserror::Error;

/// Malformed input, rejected before any probe attempt starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid timeout: {0}ms (must be greater than zero)")]
    InvalidTimeout(u128),

    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    pub(crate) fn endpoint(endpoint: &str, reason: impl Into<String>) -> Self {
        DomainError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

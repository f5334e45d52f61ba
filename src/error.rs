//! Error types for the Evalgate ingestion and metrics pipeline
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Evalgate operations
#[derive(Error, Debug)]
pub enum EvalGateError {
    /// Malformed or missing input on an ingestion payload.
    /// Reported to the caller with the offending field named.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Audit record could not be written (best-effort, never fatal)
    #[error("Audit error: {0}")]
    Audit(String),

    /// Bearer token missing or not resolvable to a tenant
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid tenant or evaluation ID format
    #[error("Invalid ID: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl EvalGateError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EvalGateError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault (4xx-class)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EvalGateError::Validation { .. }
                | EvalGateError::Unauthorized(_)
                | EvalGateError::NotFound(_)
        )
    }
}

/// Result type alias for Evalgate operations
pub type Result<T> = std::result::Result<T, EvalGateError>;

/// Convert anyhow::Error to EvalGateError
impl From<anyhow::Error> for EvalGateError {
    fn from(err: anyhow::Error) -> Self {
        EvalGateError::Other(err.to_string())
    }
}

//! Error types for audit recording.

use thiserror::Error;

/// Errors that can occur when building or delivering audit records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// A required builder field was not set.
    #[error("audit record missing required field: {0}")]
    MissingField(&'static str),

    /// The snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The sink rejected or failed to store the record.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

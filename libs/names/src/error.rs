//! Error types for name parsing and validation.

use thiserror::Error;

/// Errors that can occur when validating a name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty after trimming.
    #[error("{kind} name is required")]
    Empty { kind: &'static str },

    /// The name is shorter than the minimum length.
    #[error("{kind} name is not valid; '{value}' is shorter than the minimum allowed length ({min})")]
    TooShort {
        kind: &'static str,
        value: String,
        min: usize,
    },

    /// The name is longer than the maximum length.
    #[error("{kind} name is not valid; '{value}' is longer than the maximum allowed length ({max})")]
    TooLong {
        kind: &'static str,
        value: String,
        max: usize,
    },

    /// The name contains a character outside the allowed set.
    #[error("{kind} name is not valid; '{value}' can only contain letters, numbers, dots, dashes and underscores")]
    InvalidCharacter { kind: &'static str, value: String },
}

impl NameError {
    /// Returns the entity kind the rejected name belonged to.
    pub fn kind(&self) -> &'static str {
        match self {
            NameError::Empty { kind }
            | NameError::TooShort { kind, .. }
            | NameError::TooLong { kind, .. }
            | NameError::InvalidCharacter { kind, .. } => kind,
        }
    }

    /// Returns true if this error is a length violation.
    pub fn is_length_error(&self) -> bool {
        matches!(self, NameError::TooShort { .. } | NameError::TooLong { .. })
    }
}

//! Mutation paths for deployments, pods and the configuration, plus
//! read access to their audit history.
//!
//! Each operation validates and transforms its input, persists through the
//! [`EntityWriter`](crate::writer::EntityWriter), then runs admission on the
//! affected pod where that applies. Missing references discovered after the
//! write are reported in the returned message rather than raised.

mod configurations;
mod deployments;
mod history;
mod pods;
mod search;

pub use configurations::ConfigurationService;
pub use deployments::{DeploymentCreated, DeploymentDeleted, DeploymentService, DeploymentUpdated};
pub use history::HistoryService;
pub use pods::{PodService, PodUpdated};
pub use search::DocumentFilter;

use thiserror::Error;

use crate::capacity::CapacityError;
use crate::lifecycle::LifecycleError;
use crate::model::ValidationError;
use crate::queue::EngineError;
use crate::store::StoreError;
use crate::writer::WriteError;

/// Message for a create whose name is already taken.
pub const DUPLICATE_NAME: &str = "Name is not valid, provided name must be unique.";

/// Errors returned by the mutation services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad field value, duplicate name or an immutable field change.
    #[error("{0}")]
    Validation(String),

    /// The operation is not allowed in the current state.
    #[error("{0}")]
    Precondition(String),

    #[error("A {kind} with the name '{name}' does not exist.")]
    NotFound { kind: &'static str, name: String },

    #[error("A log does not exist for a {kind} with the name '{name}'.")]
    NoHistory { kind: &'static str, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(EngineError),
}

/// Coarse classification for mapping to transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Validation,
    Precondition,
    NotFound,
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::Validation(_) => ServiceErrorKind::Validation,
            Self::Precondition(_) => ServiceErrorKind::Precondition,
            Self::NotFound { .. } | Self::NoHistory { .. } => ServiceErrorKind::NotFound,
            Self::Store(_) | Self::Engine(_) => ServiceErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(e: LifecycleError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<CapacityError> for ServiceError {
    fn from(e: CapacityError) -> Self {
        match e {
            CapacityError::NoConfiguration => Self::Precondition(e.to_string()),
            CapacityError::Immutable { .. } => Self::Validation(e.to_string()),
        }
    }
}

impl From<WriteError> for ServiceError {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::Lifecycle(e) => e.into(),
            WriteError::Capacity(e) => e.into(),
            WriteError::Store(e) => e.into(),
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Store(e) => e.into(),
            EngineError::Write(e) => e.into(),
            other => Self::Engine(other),
        }
    }
}

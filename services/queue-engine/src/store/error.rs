//! Store error types.

use thiserror::Error;

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the backing store.
    #[error("failed to connect to store: {0}")]
    Connect(#[source] sqlx::Error),

    /// A query against the backing store failed.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// A stored document could not be decoded into the domain model.
    #[error("corrupt {entity} document '{name}': {reason}")]
    Corrupt {
        entity: &'static str,
        name: String,
        reason: String,
    },

    /// The store rejected the write (e.g. connection loss, write conflict).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

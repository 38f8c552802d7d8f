//! Repository interfaces and the store registry.
//!
//! The engine owns no durable state. It reads and writes deployments, pods
//! and the configuration through the traits below, each call being a single
//! document read or write. Two backends ship:
//! - [`MemoryStore`] for tests and single-process development
//! - [`PgStore`] backed by Postgres through SQLx

mod error;
mod memory;
mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::{DbConfig, PgStore};

use std::sync::Arc;

use async_trait::async_trait;
use oqs_audit::{AuditRecord, EntityKind};

use crate::model::{Configuration, Deployment, DeploymentName, Pod};

/// Deployment documents, keyed by name.
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    /// All deployments, in no particular order.
    async fn list(&self) -> StoreResult<Vec<Deployment>>;

    async fn get(&self, name: &str) -> StoreResult<Option<Deployment>>;

    /// Deployments whose names are in `names`; unknown names are skipped.
    async fn find_by_names(&self, names: &[DeploymentName]) -> StoreResult<Vec<Deployment>>;

    /// Active deployments that have a running start time.
    async fn find_running(&self) -> StoreResult<Vec<Deployment>>;

    /// Inserts or replaces the document with the same name.
    async fn save(&self, deployment: &Deployment) -> StoreResult<()>;

    /// Removes a document. Returns false if it did not exist.
    async fn remove(&self, name: &str) -> StoreResult<bool>;
}

/// Pod documents, keyed by name.
#[async_trait]
pub trait PodRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Pod>>;

    async fn get(&self, name: &str) -> StoreResult<Option<Pod>>;

    async fn save(&self, pod: &Pod) -> StoreResult<()>;

    async fn remove(&self, name: &str) -> StoreResult<bool>;
}

/// The configuration document. At most one exists at a time.
#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Configuration>>;

    /// The configuration pods are reconciled against, if one exists.
    async fn active(&self) -> StoreResult<Option<Configuration>>;

    async fn save(&self, configuration: &Configuration) -> StoreResult<()>;

    async fn remove(&self, name: &str) -> StoreResult<bool>;
}

/// Append-only log of audit records, read back per entity kind.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()>;

    /// Every record for `kind`, oldest first.
    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<AuditRecord>>;

    /// Records for one entity, oldest first. Empty if it was never recorded.
    async fn for_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Vec<AuditRecord>>;
}

/// One repository per entity kind plus the history log, resolved once at
/// startup.
#[derive(Clone)]
pub struct Store {
    deployments: Arc<dyn DeploymentRepository>,
    pods: Arc<dyn PodRepository>,
    configurations: Arc<dyn ConfigurationRepository>,
    history: Arc<dyn HistoryRepository>,
}

impl Store {
    pub fn new(
        deployments: Arc<dyn DeploymentRepository>,
        pods: Arc<dyn PodRepository>,
        configurations: Arc<dyn ConfigurationRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            deployments,
            pods,
            configurations,
            history,
        }
    }

    /// A store whose repositories share one in-memory backend.
    pub fn memory(backend: Arc<MemoryStore>) -> Self {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    /// A store whose repositories share one Postgres pool.
    pub fn postgres(backend: Arc<PgStore>) -> Self {
        Self::new(backend.clone(), backend.clone(), backend.clone(), backend)
    }

    pub fn deployments(&self) -> &dyn DeploymentRepository {
        self.deployments.as_ref()
    }

    pub fn pods(&self) -> &dyn PodRepository {
        self.pods.as_ref()
    }

    pub fn configurations(&self) -> &dyn ConfigurationRepository {
        self.configurations.as_ref()
    }

    pub fn history(&self) -> &dyn HistoryRepository {
        self.history.as_ref()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

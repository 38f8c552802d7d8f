//! Application state shared across request handlers.

use std::sync::Arc;

use crate::queue::Engine;
use crate::service::{ConfigurationService, DeploymentService, HistoryService, PodService};
use crate::store::PgStore;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: Engine,
    deployments: DeploymentService,
    pods: PodService,
    configurations: ConfigurationService,
    history: HistoryService,
    database: Option<PgStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `database` is set when the store is Postgres-backed, so readiness can
    /// probe it.
    pub fn new(engine: Engine, database: Option<PgStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                deployments: DeploymentService::new(engine.clone()),
                pods: PodService::new(engine.clone()),
                configurations: ConfigurationService::new(engine.clone()),
                history: HistoryService::new(engine.clone()),
                engine,
                database,
            }),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn deployments(&self) -> &DeploymentService {
        &self.inner.deployments
    }

    pub fn pods(&self) -> &PodService {
        &self.inner.pods
    }

    pub fn configurations(&self) -> &ConfigurationService {
        &self.inner.configurations
    }

    pub fn history(&self) -> &HistoryService {
        &self.inner.history
    }

    pub fn database(&self) -> Option<&PgStore> {
        self.inner.database.as_ref()
    }
}

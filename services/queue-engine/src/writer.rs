//! Validate-transform-persist for every entity write.
//!
//! Callers never save documents directly. [`EntityWriter`] runs the pure
//! preparation step ([`prepare_deployment`], [`prepare_pod`]), writes the
//! result through the [`Store`], then publishes an audit record.

use std::sync::Arc;

use oqs_audit::{Actor, EntityKind};
use thiserror::Error;
use tracing::debug;

use crate::audit::{publish, AuditSink};
use crate::capacity::{prepare_pod, CapacityError};
use crate::clock::Clock;
use crate::lifecycle::{prepare_deployment, LifecycleError, Origin};
use crate::model::{Configuration, Deployment, Pod, PodName, QueueStatus};
use crate::store::{Store, StoreError};

/// Errors raised by a single entity write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists entities through their preparation step and the audit sink.
#[derive(Clone)]
pub struct EntityWriter {
    store: Store,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl EntityWriter {
    pub fn new(store: Store, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            clock,
            audit,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Persists `next`, where `previous` is the currently stored document.
    ///
    /// A terminal transition bumps the parent pod counter before the
    /// deployment is written. A missing parent pod is created with the
    /// deployment already listed.
    ///
    /// A request for Active on a deployment that is not already running is
    /// stored as Queued. Admission promotes it later if the pod has room.
    pub async fn save_deployment(
        &self,
        previous: Option<&Deployment>,
        next: Deployment,
        actor: &Actor,
    ) -> Result<Deployment, WriteError> {
        self.persist_deployment(previous, next, actor, Origin::Request)
            .await
    }

    /// Promotes a queued deployment to Active. Only the admission engine
    /// calls this, after checking the pod has room for it.
    pub(crate) async fn admit_deployment(
        &self,
        queued: &Deployment,
        mut next: Deployment,
    ) -> Result<Deployment, WriteError> {
        next.queue_status = QueueStatus::Active;
        self.persist_deployment(Some(queued), next, &Actor::System, Origin::Admission)
            .await
    }

    async fn persist_deployment(
        &self,
        previous: Option<&Deployment>,
        next: Deployment,
        actor: &Actor,
        origin: Origin,
    ) -> Result<Deployment, WriteError> {
        let now = self.clock.now();
        let transition = prepare_deployment(previous, next, now, origin)?;
        let deployment = transition.deployment;

        if let Some(counter) = transition.counter {
            let stored = self
                .store
                .pods()
                .get(deployment.associated_pod.as_str())
                .await?;
            let mut pod = stored
                .clone()
                .unwrap_or_else(|| Pod::new(deployment.associated_pod.clone()));
            pod.link_deployment(&deployment.name);
            pod.counters.increment(counter);
            debug!(
                pod = %pod.name,
                deployment = %deployment.name,
                counter = counter.as_str(),
                "Incrementing pod counter"
            );
            self.save_pod(stored.as_ref(), pod, actor).await?;
        }

        self.store.deployments().save(&deployment).await?;
        publish(
            self.audit.as_ref(),
            EntityKind::Deployment,
            deployment.name.as_str(),
            actor,
            now,
            previous,
            Some(&deployment),
        )
        .await;

        Ok(deployment)
    }

    pub async fn remove_deployment(
        &self,
        deployment: &Deployment,
        actor: &Actor,
    ) -> Result<bool, WriteError> {
        let removed = self
            .store
            .deployments()
            .remove(deployment.name.as_str())
            .await?;
        if removed {
            publish(
                self.audit.as_ref(),
                EntityKind::Deployment,
                deployment.name.as_str(),
                actor,
                self.clock.now(),
                Some(deployment),
                None,
            )
            .await;
        }
        Ok(removed)
    }

    /// Persists `next` reconciled against the active configuration.
    pub async fn save_pod(
        &self,
        previous: Option<&Pod>,
        next: Pod,
        actor: &Actor,
    ) -> Result<Pod, WriteError> {
        let configuration = self.store.configurations().active().await?;
        let pod = prepare_pod(previous, next, configuration.as_ref())?;

        self.store.pods().save(&pod).await?;
        publish(
            self.audit.as_ref(),
            EntityKind::Pod,
            pod.name.as_str(),
            actor,
            self.clock.now(),
            previous,
            Some(&pod),
        )
        .await;

        Ok(pod)
    }

    /// Loads the named pod, or a fresh unsaved one if it does not exist.
    pub async fn load_or_new_pod(&self, name: &PodName) -> Result<(Option<Pod>, Pod), WriteError> {
        let stored = self.store.pods().get(name.as_str()).await?;
        let working = stored.clone().unwrap_or_else(|| Pod::new(name.clone()));
        Ok((stored, working))
    }

    pub async fn remove_pod(&self, pod: &Pod, actor: &Actor) -> Result<bool, WriteError> {
        let removed = self.store.pods().remove(pod.name.as_str()).await?;
        if removed {
            publish(
                self.audit.as_ref(),
                EntityKind::Pod,
                pod.name.as_str(),
                actor,
                self.clock.now(),
                Some(pod),
                None,
            )
            .await;
        }
        Ok(removed)
    }

    pub async fn save_configuration(
        &self,
        previous: Option<&Configuration>,
        next: Configuration,
        actor: &Actor,
    ) -> Result<Configuration, WriteError> {
        self.store.configurations().save(&next).await?;
        publish(
            self.audit.as_ref(),
            EntityKind::Configuration,
            next.name.as_str(),
            actor,
            self.clock.now(),
            previous,
            Some(&next),
        )
        .await;
        Ok(next)
    }

    pub async fn remove_configuration(
        &self,
        configuration: &Configuration,
        actor: &Actor,
    ) -> Result<bool, WriteError> {
        let removed = self
            .store
            .configurations()
            .remove(configuration.name.as_str())
            .await?;
        if removed {
            publish(
                self.audit.as_ref(),
                EntityKind::Configuration,
                configuration.name.as_str(),
                actor,
                self.clock.now(),
                Some(configuration),
                None,
            )
            .await;
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for EntityWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityWriter")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::clock::ManualClock;
    use crate::model::{ConfigurationName, DeploymentName, QueueStatus};
    use crate::store::{DeploymentRepository, MemoryStore, PodRepository};
    use oqs_audit::AuditAction;

    struct Fixture {
        writer: EntityWriter,
        backend: Arc<MemoryStore>,
        audit: Arc<MemoryAuditSink>,
    }

    async fn fixture(with_configuration: bool) -> Fixture {
        let backend = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let writer = EntityWriter::new(
            Store::memory(backend.clone()),
            Arc::new(ManualClock::default()),
            audit.clone(),
        );
        if with_configuration {
            let configuration = Configuration::new(ConfigurationName::parse("default").unwrap());
            writer
                .save_configuration(None, configuration, &Actor::System)
                .await
                .unwrap();
        }
        Fixture {
            writer,
            backend,
            audit,
        }
    }

    fn draft(name: &str) -> Deployment {
        Deployment::new(
            DeploymentName::parse(name).unwrap(),
            PodName::parse("cloud1").unwrap(),
            "vENM",
        )
    }

    #[tokio::test]
    async fn test_terminal_transition_creates_missing_pod_with_counter() {
        let f = fixture(true).await;
        let created = f
            .writer
            .save_deployment(None, draft("ieatenm1"), &Actor::System)
            .await
            .unwrap();

        let mut finished = created.clone();
        finished.queue_status = QueueStatus::Finished;
        f.writer
            .save_deployment(Some(&created), finished, &Actor::System)
            .await
            .unwrap();

        let pod = PodRepository::get(f.backend.as_ref(), "cloud1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pod.counters.total_install_successes, 1);
        assert!(pod.has_deployment("ieatenm1"));
        assert_eq!(pod.load_tolerance(), 50);
    }

    #[tokio::test]
    async fn test_counter_bump_fails_without_configuration() {
        let f = fixture(false).await;
        let created = f
            .writer
            .save_deployment(None, draft("ieatenm1"), &Actor::System)
            .await
            .unwrap();

        let mut failed = created.clone();
        failed.queue_status = QueueStatus::Failed;
        let err = f
            .writer
            .save_deployment(Some(&created), failed, &Actor::System)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WriteError::Capacity(CapacityError::NoConfiguration)
        ));

        let stored = DeploymentRepository::get(f.backend.as_ref(), "ieatenm1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.queue_status, QueueStatus::Queued);
    }

    #[tokio::test]
    async fn test_writes_are_audited() {
        let f = fixture(true).await;
        let created = f
            .writer
            .save_deployment(None, draft("ieatenm1"), &Actor::System)
            .await
            .unwrap();
        f.writer
            .remove_deployment(&created, &Actor::User("alice".to_string()))
            .await
            .unwrap();

        let actions: Vec<_> = f
            .audit
            .records()
            .into_iter()
            .filter(|r| r.entity_kind == EntityKind::Deployment)
            .map(|r| r.action)
            .collect();
        assert_eq!(actions, vec![AuditAction::Created, AuditAction::Deleted]);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let f = fixture(true).await;
        f.backend.fail_writes_for("ieatenm1");
        let err = f
            .writer
            .save_deployment(None, draft("ieatenm1"), &Actor::System)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Store(StoreError::Unavailable(_))));
        assert!(f.audit.records().iter().all(|r| r.entity_name != "ieatenm1"));
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use oqs_audit::{Actor, AuditRecord, EntityKind};
use oqs_queue_engine::{
    audit::HistoryAuditSink,
    clock::ManualClock,
    model::{
        CatalogProduct, Configuration, ConfigurationName, ConfigurationPatch, Deployment,
        DeploymentPatch, NewDeployment, NewPod, Pod, PodPatch, QueueStatus,
    },
    queue::Engine,
    service::{ConfigurationService, DeploymentService, PodService},
    store::{DeploymentRepository, HistoryRepository, MemoryStore, PodRepository, Store},
    writer::EntityWriter,
};

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub struct Harness {
    pub backend: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub engine: Engine,
    pub deployments: DeploymentService,
    pub pods: PodService,
    pub configurations: ConfigurationService,
    pub actor: Actor,
}

impl Harness {
    /// A harness with the default configuration already created.
    pub async fn new() -> Self {
        let harness = Self::without_configuration();
        harness
            .configurations
            .create(
                Configuration::new(ConfigurationName::parse("default").unwrap()),
                &harness.actor,
            )
            .await
            .unwrap();
        harness
    }

    pub fn without_configuration() -> Self {
        let backend = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Store::memory(backend.clone());
        let audit = Arc::new(HistoryAuditSink::new(store.clone()));
        let writer = EntityWriter::new(store, clock.clone(), audit);
        let engine = Engine::new(writer);
        Self {
            deployments: DeploymentService::new(engine.clone()),
            pods: PodService::new(engine.clone()),
            configurations: ConfigurationService::new(engine.clone()),
            backend,
            clock,
            engine,
            actor: Actor::User("tester".to_string()),
        }
    }

    /// Every audit record the engine has written for `kind`, oldest first.
    pub async fn history(&self, kind: EntityKind) -> Vec<AuditRecord> {
        HistoryRepository::list(self.backend.as_ref(), kind)
            .await
            .unwrap()
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    pub fn advance_seconds(&self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
    }

    /// Creates a pod with the given tolerance and catalog products.
    pub async fn pod(&self, name: &str, tolerance: u32) -> Pod {
        let request = NewPod {
            pod_load_tolerance: Some(tolerance),
            ..NewPod::new(name)
        };
        self.pods.create(request, &self.actor).await.unwrap()
    }

    /// Creates a deployment one second after the previous clock reading.
    pub async fn create(&self, request: NewDeployment) -> Deployment {
        self.advance_seconds(1);
        self.deployments
            .create(request, &self.actor)
            .await
            .unwrap()
            .new_deployment
    }

    pub async fn set_status(&self, name: &str, status: QueueStatus) -> String {
        self.deployments
            .update(name, DeploymentPatch::queue_status(status), &self.actor)
            .await
            .unwrap()
            .queue_message
    }

    pub async fn set_tolerance(&self, pod: &str, tolerance: u32) -> String {
        self.pods
            .update(pod, PodPatch::load_tolerance(tolerance), &self.actor)
            .await
            .unwrap()
            .queue_message
    }

    /// Replaces the catalog of the default configuration.
    pub async fn set_catalog(&self, products: Vec<CatalogProduct>) {
        let patch = ConfigurationPatch {
            products: Some(products),
            ..Default::default()
        };
        self.configurations
            .update("default", patch, &self.actor)
            .await
            .unwrap();
    }

    pub async fn deployment(&self, name: &str) -> Deployment {
        DeploymentRepository::get(self.backend.as_ref(), name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("deployment {name} missing"))
    }

    pub async fn stored_pod(&self, name: &str) -> Option<Pod> {
        PodRepository::get(self.backend.as_ref(), name).await.unwrap()
    }

    pub async fn status(&self, name: &str) -> QueueStatus {
        self.deployment(name).await.queue_status
    }

    /// Overwrites a pod document directly, bypassing the engine.
    pub async fn overwrite_pod(&self, pod: &Pod) {
        PodRepository::save(self.backend.as_ref(), pod).await.unwrap();
    }

    pub async fn drop_pod(&self, name: &str) {
        PodRepository::remove(self.backend.as_ref(), name)
            .await
            .unwrap();
    }
}

impl Harness {
    pub fn clock_now(&self) -> DateTime<Utc> {
        use oqs_queue_engine::clock::Clock;
        self.clock.now()
    }
}

//! In-memory repositories.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use oqs_audit::{AuditRecord, EntityKind};
use tokio::sync::RwLock;

use super::{
    ConfigurationRepository, DeploymentRepository, HistoryRepository, PodRepository, StoreError,
    StoreResult,
};
use crate::model::{Configuration, Deployment, DeploymentName, Pod, QueueStatus};

#[derive(Debug, Default)]
struct Documents {
    deployments: BTreeMap<String, Deployment>,
    pods: BTreeMap<String, Pod>,
    configurations: BTreeMap<String, Configuration>,
    history: Vec<AuditRecord>,
}

/// A process-local store holding every document behind one lock.
///
/// Writes to names registered with [`MemoryStore::fail_writes_for`] are
/// rejected with [`StoreError::Unavailable`], which lets tests exercise
/// per-item error isolation in the sweeps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Documents>,
    failing: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write to a document named `name`.
    pub fn fail_writes_for(&self, name: impl Into<String>) {
        self.failing_names().insert(name.into());
    }

    /// Clear all injected write failures.
    pub fn clear_failures(&self) {
        self.failing_names().clear();
    }

    fn failing_names(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self, name: &str) -> StoreResult<()> {
        if self.failing_names().contains(name) {
            return Err(StoreError::Unavailable(format!(
                "write to '{name}' rejected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentRepository for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Deployment>> {
        let docs = self.documents.read().await;
        Ok(docs.deployments.values().cloned().collect())
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Deployment>> {
        let docs = self.documents.read().await;
        Ok(docs.deployments.get(name).cloned())
    }

    async fn find_by_names(&self, names: &[DeploymentName]) -> StoreResult<Vec<Deployment>> {
        let docs = self.documents.read().await;
        Ok(names
            .iter()
            .filter_map(|name| docs.deployments.get(name.as_str()).cloned())
            .collect())
    }

    async fn find_running(&self) -> StoreResult<Vec<Deployment>> {
        let docs = self.documents.read().await;
        Ok(docs
            .deployments
            .values()
            .filter(|d| d.is_running())
            .cloned()
            .collect())
    }

    async fn save(&self, deployment: &Deployment) -> StoreResult<()> {
        self.check_writable(deployment.name.as_str())?;
        let mut docs = self.documents.write().await;
        docs.deployments
            .insert(deployment.name.to_string(), deployment.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        self.check_writable(name)?;
        let mut docs = self.documents.write().await;
        Ok(docs.deployments.remove(name).is_some())
    }
}

#[async_trait]
impl PodRepository for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Pod>> {
        let docs = self.documents.read().await;
        Ok(docs.pods.values().cloned().collect())
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Pod>> {
        let docs = self.documents.read().await;
        Ok(docs.pods.get(name).cloned())
    }

    async fn save(&self, pod: &Pod) -> StoreResult<()> {
        self.check_writable(pod.name.as_str())?;
        let mut docs = self.documents.write().await;
        docs.pods.insert(pod.name.to_string(), pod.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        self.check_writable(name)?;
        let mut docs = self.documents.write().await;
        Ok(docs.pods.remove(name).is_some())
    }
}

#[async_trait]
impl ConfigurationRepository for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Configuration>> {
        let docs = self.documents.read().await;
        Ok(docs.configurations.values().cloned().collect())
    }

    async fn active(&self) -> StoreResult<Option<Configuration>> {
        let docs = self.documents.read().await;
        Ok(docs.configurations.values().next().cloned())
    }

    async fn save(&self, configuration: &Configuration) -> StoreResult<()> {
        self.check_writable(configuration.name.as_str())?;
        let mut docs = self.documents.write().await;
        docs.configurations
            .insert(configuration.name.to_string(), configuration.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        self.check_writable(name)?;
        let mut docs = self.documents.write().await;
        Ok(docs.configurations.remove(name).is_some())
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        let mut docs = self.documents.write().await;
        docs.history.push(record.clone());
        Ok(())
    }

    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<AuditRecord>> {
        let docs = self.documents.read().await;
        Ok(docs
            .history
            .iter()
            .filter(|r| r.entity_kind == kind)
            .cloned()
            .collect())
    }

    async fn for_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Vec<AuditRecord>> {
        let docs = self.documents.read().await;
        Ok(docs
            .history
            .iter()
            .filter(|r| r.entity_kind == kind && r.entity_name == name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeploymentName, PodName};

    fn deployment(name: &str) -> Deployment {
        Deployment::new(
            DeploymentName::parse(name).unwrap(),
            PodName::parse("cloud1").unwrap(),
            "vENM",
        )
    }

    #[tokio::test]
    async fn test_save_replaces_by_name() {
        let store = MemoryStore::new();
        let mut d = deployment("ieatenm1");
        DeploymentRepository::save(&store, &d).await.unwrap();
        d.queue_status = QueueStatus::Active;
        DeploymentRepository::save(&store, &d).await.unwrap();

        let all = DeploymentRepository::list(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].queue_status, QueueStatus::Active);
    }

    #[tokio::test]
    async fn test_find_by_names_skips_unknown() {
        let store = MemoryStore::new();
        DeploymentRepository::save(&store, &deployment("ieatenm1"))
            .await
            .unwrap();

        let names = vec![
            DeploymentName::parse("ieatenm1").unwrap(),
            DeploymentName::parse("ghost99").unwrap(),
        ];
        let found = store.find_by_names(&names).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "ieatenm1");
    }

    #[tokio::test]
    async fn test_find_running_requires_start_time() {
        let store = MemoryStore::new();
        let mut running = deployment("running1");
        running.queue_status = QueueStatus::Active;
        running.instance_running_start_time = Some(chrono::Utc::now());
        let mut stamped_less = deployment("nostart1");
        stamped_less.queue_status = QueueStatus::Active;
        DeploymentRepository::save(&store, &running).await.unwrap();
        DeploymentRepository::save(&store, &stamped_less)
            .await
            .unwrap();

        let found = store.find_running().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "running1");
    }

    #[tokio::test]
    async fn test_history_filters_by_kind_and_name_in_append_order() {
        let store = MemoryStore::new();
        let first = deployment("ieatenm1");
        let mut second = first.clone();
        second.queue_status = QueueStatus::Active;
        let records = [
            AuditRecord::builder()
                .entity(EntityKind::Deployment, "ieatenm1")
                .after(&first)
                .unwrap()
                .build()
                .unwrap(),
            AuditRecord::builder()
                .entity(EntityKind::Deployment, "ieatenm2")
                .after(&deployment("ieatenm2"))
                .unwrap()
                .build()
                .unwrap(),
            AuditRecord::builder()
                .entity(EntityKind::Deployment, "ieatenm1")
                .before(&first)
                .unwrap()
                .after(&second)
                .unwrap()
                .build()
                .unwrap(),
        ];
        for record in &records {
            store.append(record).await.unwrap();
        }

        assert_eq!(
            HistoryRepository::list(&store, EntityKind::Deployment)
                .await
                .unwrap()
                .len(),
            3
        );
        assert!(HistoryRepository::list(&store, EntityKind::Pod)
            .await
            .unwrap()
            .is_empty());

        let own = store
            .for_entity(EntityKind::Deployment, "ieatenm1")
            .await
            .unwrap();
        assert_eq!(own.len(), 2);
        assert_eq!(own[0].audit_id, records[0].audit_id);
        assert_eq!(own[1].changes, vec!["queueStatus".to_string()]);
    }

    #[tokio::test]
    async fn test_injected_failure_rejects_writes() {
        let store = MemoryStore::new();
        store.fail_writes_for("ieatenm1");

        let err = DeploymentRepository::save(&store, &deployment("ieatenm1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.clear_failures();
        DeploymentRepository::save(&store, &deployment("ieatenm1"))
            .await
            .unwrap();
    }
}

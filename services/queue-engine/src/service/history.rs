use oqs_audit::{AuditRecord, EntityKind};

use super::ServiceError;
use crate::queue::Engine;

/// Read access to the audit log kept by the history sink.
#[derive(Debug, Clone)]
pub struct HistoryService {
    engine: Engine,
}

impl HistoryService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<AuditRecord>, ServiceError> {
        Ok(self.engine.writer().store().history().list(kind).await?)
    }

    /// Every record for one entity, oldest first. Deleted entities keep
    /// their history.
    pub async fn for_entity(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<AuditRecord>, ServiceError> {
        let records = self
            .engine
            .writer()
            .store()
            .history()
            .for_entity(kind, name)
            .await?;
        if records.is_empty() {
            return Err(ServiceError::NoHistory {
                kind: label(kind),
                name: name.to_string(),
            });
        }
        Ok(records)
    }
}

fn label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Deployment => "Deployment",
        EntityKind::Pod => "Pod",
        EntityKind::Configuration => "Configuration",
    }
}

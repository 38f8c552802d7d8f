//! Publishing audit records for persisted mutations.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oqs_audit::{is_auditable, Actor, AuditError, AuditRecord, EntityKind};
use serde::Serialize;
use tracing::{info, warn};

use crate::store::Store;

/// Receives one record per persisted create, update or delete.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Emits each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        info!(
            audit_id = %record.audit_id,
            entity_kind = %record.entity_kind,
            entity_name = %record.entity_name,
            action = %record.action,
            actor = %record.actor,
            changes = ?record.changes,
            "audit"
        );
        Ok(())
    }
}

/// Logs each record like [`TracingAuditSink`] and appends it to the store's
/// history log, where the history API reads it back.
#[derive(Clone)]
pub struct HistoryAuditSink {
    store: Store,
}

impl HistoryAuditSink {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditSink for HistoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.store
            .history()
            .append(&record)
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        TracingAuditSink.record(record).await
    }
}

/// Keeps records in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record received so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
        Ok(())
    }
}

/// Builds and publishes a record for one mutation.
///
/// Health-check artifacts and updates that changed nothing are skipped.
/// Failures are logged and swallowed.
pub(crate) async fn publish<T: Serialize>(
    sink: &dyn AuditSink,
    kind: EntityKind,
    name: &str,
    actor: &Actor,
    occurred_at: DateTime<Utc>,
    before: Option<&T>,
    after: Option<&T>,
) {
    if !is_auditable(name) {
        return;
    }

    let record = match build(kind, name, actor, occurred_at, before, after) {
        Ok(record) => record,
        Err(e) => {
            warn!(entity_kind = %kind, entity_name = name, error = %e, "Failed to build audit record");
            return;
        }
    };
    if record.is_noop() {
        return;
    }

    if let Err(e) = sink.record(record).await {
        warn!(entity_kind = %kind, entity_name = name, error = %e, "Failed to publish audit record");
    }
}

fn build<T: Serialize>(
    kind: EntityKind,
    name: &str,
    actor: &Actor,
    occurred_at: DateTime<Utc>,
    before: Option<&T>,
    after: Option<&T>,
) -> Result<AuditRecord, AuditError> {
    let mut builder = AuditRecord::builder()
        .entity(kind, name)
        .actor(actor.clone())
        .occurred_at(occurred_at);
    if let Some(before) = before {
        builder = builder.before(before)?;
    }
    if let Some(after) = after {
        builder = builder.after(after)?;
    }
    builder.build()
}

//! Audit record - the common wrapper for every persisted mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use crate::{changed_fields, AuditError};

/// Kind of entity a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Deployment,
    Pod,
    Configuration,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Deployment => "deployment",
            EntityKind::Pod => "pod",
            EntityKind::Configuration => "configuration",
        };
        write!(f, "{}", s)
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Created => write!(f, "created"),
            AuditAction::Updated => write!(f, "updated"),
            AuditAction::Deleted => write!(f, "deleted"),
        }
    }
}

/// Who performed the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// A caller of the engine, identified by the outer layer.
    User(String),
    /// The engine itself (admission, sweeps).
    #[default]
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{}", id),
            Actor::System => write!(f, "system"),
        }
    }
}

/// A single audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Time-ordered record identifier.
    pub audit_id: Ulid,

    /// When the mutation was persisted.
    pub occurred_at: DateTime<Utc>,

    /// The kind of entity that changed.
    pub entity_kind: EntityKind,

    /// The entity's name.
    pub entity_name: String,

    /// The mutation performed.
    pub action: AuditAction,

    /// Who performed it.
    pub actor: Actor,

    /// Snapshot before the mutation (absent on create).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    /// Snapshot after the mutation (absent on delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,

    /// Top-level fields that differ between `before` and `after`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl AuditRecord {
    /// Creates a new audit record builder.
    pub fn builder() -> AuditRecordBuilder {
        AuditRecordBuilder::new()
    }

    /// Returns true if this is an update that changed nothing.
    pub fn is_noop(&self) -> bool {
        self.action == AuditAction::Updated && self.changes.is_empty()
    }
}

/// Builder for constructing audit records.
#[derive(Debug, Default)]
pub struct AuditRecordBuilder {
    occurred_at: Option<DateTime<Utc>>,
    entity_kind: Option<EntityKind>,
    entity_name: Option<String>,
    actor: Actor,
    before: Option<Value>,
    after: Option<Value>,
}

impl AuditRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occurred_at(mut self, ts: DateTime<Utc>) -> Self {
        self.occurred_at = Some(ts);
        self
    }

    pub fn entity(mut self, kind: EntityKind, name: impl Into<String>) -> Self {
        self.entity_kind = Some(kind);
        self.entity_name = Some(name.into());
        self
    }

    pub fn actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the before snapshot from any serializable value.
    pub fn before<T: Serialize>(mut self, before: &T) -> Result<Self, AuditError> {
        self.before = Some(serde_json::to_value(before)?);
        Ok(self)
    }

    /// Sets the after snapshot from any serializable value.
    pub fn after<T: Serialize>(mut self, after: &T) -> Result<Self, AuditError> {
        self.after = Some(serde_json::to_value(after)?);
        Ok(self)
    }

    /// Builds the record.
    ///
    /// The action is derived from which snapshots are present: only `after`
    /// is a create, only `before` is a delete, both is an update.
    pub fn build(self) -> Result<AuditRecord, AuditError> {
        let entity_kind = self.entity_kind.ok_or(AuditError::MissingField("entity_kind"))?;
        let entity_name = self.entity_name.ok_or(AuditError::MissingField("entity_name"))?;

        let (action, changes) = match (&self.before, &self.after) {
            (None, Some(_)) => (AuditAction::Created, Vec::new()),
            (Some(_), None) => (AuditAction::Deleted, Vec::new()),
            (Some(b), Some(a)) => (AuditAction::Updated, changed_fields(b, a)),
            (None, None) => return Err(AuditError::MissingField("before/after")),
        };

        Ok(AuditRecord {
            audit_id: Ulid::new(),
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            entity_kind,
            entity_name,
            action,
            actor: self.actor,
            before: self.before,
            after: self.after,
            changes,
        })
    }
}

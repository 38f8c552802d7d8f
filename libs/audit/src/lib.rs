//! # oqs-audit
//!
//! Audit record definitions for every mutation the queue engine persists.
//!
//! ## Design Principles
//!
//! - Records are immutable snapshots of a single create, update or delete
//! - Each record carries the full before/after documents plus the list of
//!   top-level fields that changed
//! - Recording is fire-and-forget from the engine's perspective; producing a
//!   record never fails a mutation
//!
//! ## Record Envelope
//!
//! - Ordering (`audit_id`, a ULID, and `occurred_at`)
//! - Subject (`entity_kind`, `entity_name`)
//! - What happened (`action`, `changes`)
//! - Who did it (`actor`)

mod diff;
mod error;
mod record;

pub use diff::changed_fields;
pub use error::AuditError;
pub use record::*;

/// Prefix of health-check artifacts that are never audited.
pub const HEALTH_CHECK_PREFIX: &str = "A_Health_";

/// Returns true if an entity with this name should be audited.
pub fn is_auditable(entity_name: &str) -> bool {
    !entity_name.starts_with(HEALTH_CHECK_PREFIX)
}

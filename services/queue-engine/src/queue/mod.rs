//! The queue engine: admission, timeout supervision and relationship repair.
//!
//! [`Engine`] is the single entry point used by the mutation services, the
//! sweep scheduler and the HTTP triggers. Every entry point returns a report
//! with a human-readable message rather than failing on per-item problems;
//! only store failures outside a per-item loop surface as [`EngineError`].

mod admission;
mod relationships;
mod report;
mod timeouts;

pub use admission::{PodLink, QueueOutcome};
pub use report::generate_response_string;
pub use timeouts::FALLBACK_TIMEOUT_MINUTES;

use serde::Serialize;
use thiserror::Error;

use crate::model::{PodName, QueueStatus};
use crate::store::StoreError;
use crate::writer::{EntityWriter, WriteError};

/// Engine failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Associated Pod {0} could not be found.")]
    PodNotFound(PodName),

    #[error("Product has no Time-Out value specified.")]
    NoTimeoutValue,

    #[error("Failed to set Queue-Status to '{status}': {source}")]
    StatusUpdate {
        status: QueueStatus,
        #[source]
        source: WriteError,
    },
}

/// The periodic batch passes the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    /// Expire Active deployments that ran past their budget.
    Timeouts,
    /// Run admission for every pod.
    DeploymentStart,
    /// Re-link deployments missing from their parent pod.
    Relationships,
}

impl SweepKind {
    pub const ALL: [SweepKind; 3] = [Self::Timeouts, Self::DeploymentStart, Self::Relationships];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeouts => "timeouts",
            Self::DeploymentStart => "deployment_start",
            Self::Relationships => "relationships",
        }
    }
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started a sweep. Only changes the report header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    OnDemand,
    Scheduled,
}

impl Trigger {
    pub fn header(&self, kind: SweepKind) -> &'static str {
        match (kind, self) {
            (SweepKind::Timeouts, Trigger::OnDemand) => "Timed-Out Deployment Jobs Canceller: ",
            (SweepKind::Timeouts, Trigger::Scheduled) => {
                "Scheduled Timed-Out Deployment Jobs Canceller: "
            }
            (SweepKind::DeploymentStart, Trigger::OnDemand) => "Queued Deployment Jobs Starter: ",
            (SweepKind::DeploymentStart, Trigger::Scheduled) => {
                "Scheduled Queued Deployment Jobs Starter: "
            }
            (SweepKind::Relationships, Trigger::OnDemand) => {
                "Pod-Deployment Relationship Re-Associations: "
            }
            (SweepKind::Relationships, Trigger::Scheduled) => {
                "Scheduled Pod/Deployment Relationship Re-Associations: "
            }
        }
    }
}

/// Item counts for one sweep run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Items inspected.
    pub processed: usize,
    /// Items whose state was changed.
    pub changed: usize,
    /// Items referenced but not found.
    pub not_found: usize,
    /// Items that failed.
    pub failed: usize,
}

/// Outcome of a sweep: a message and, on per-item failures, an error summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub stats: SweepStats,
}

impl SweepReport {
    fn new(message: String, error: Option<String>, stats: SweepStats) -> Self {
        Self {
            message,
            error,
            stats,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// The admission engine, timeout supervisor and relationship reconciler.
#[derive(Debug, Clone)]
pub struct Engine {
    writer: EntityWriter,
}

impl Engine {
    pub fn new(writer: EntityWriter) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &EntityWriter {
        &self.writer
    }

    /// Runs one sweep of `kind`.
    pub async fn run_sweep(&self, kind: SweepKind, trigger: Trigger) -> SweepReport {
        match kind {
            SweepKind::Timeouts => self.handle_deployment_timeouts(trigger).await,
            SweepKind::DeploymentStart => self.handle_deployment_start(trigger).await,
            SweepKind::Relationships => self.handle_relationship_verification(trigger).await,
        }
    }
}

//! Deployment state machine.
//!
//! Every deployment persist goes through [`prepare_deployment`] first. It is a
//! pure function of the stored document, the proposed document and the
//! current time, and returns the document to write plus the pod counter the
//! transition should bump.
//!
//! ```text
//!            admission only         external / supervisor
//!  Queued ─────────────► Active ─────────────────────────► Finished | Failed | Timed-Out
//!    ▲                      │                                         │
//!    └──────────────────────┴──────── re-queued by update ◄───────────┘
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Deployment, PodCounter, QueueStatus, ValidationError};

/// Errors raised while preparing a deployment for persist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Deployment '{field}' field is immutable and cannot be modified.")]
    Immutable { field: &'static str },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Who is asking for the write.
///
/// Only [`Origin::Admission`] may move a deployment into Active. Any other
/// request for Active on a deployment that is not already running is turned
/// into Queued, and admission then decides whether it fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A caller of the engine or one of the sweeps.
    Request,
    /// The admission engine promoting a queued deployment.
    Admission,
}

/// Result of preparing a deployment for persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The document to write.
    pub deployment: Deployment,

    /// Parent pod counter to increment, set only when a terminal state is entered.
    pub counter: Option<PodCounter>,
}

impl Transition {
    fn unchanged_counters(deployment: Deployment) -> Self {
        Self {
            deployment,
            counter: None,
        }
    }
}

/// Validates `next` against the stored `previous` and stamps lifecycle fields.
///
/// - create: always Queued, `queuingStartTime` set
/// - into Queued: `queuingStartTime` set, running times cleared
/// - into Active (admission only): `instanceRunningStartTime` set, finish time cleared
/// - Active requested from outside admission for a deployment that is not
///   running: coerced to Queued
/// - into a terminal state: finish time set, start time backfilled, counter bumped
pub fn prepare_deployment(
    previous: Option<&Deployment>,
    mut next: Deployment,
    now: DateTime<Utc>,
    origin: Origin,
) -> Result<Transition, LifecycleError> {
    next.validate()?;

    let Some(previous) = previous else {
        next.queue_status = QueueStatus::Queued;
        next.queuing_start_time = Some(now);
        next.instance_running_start_time = None;
        next.instance_running_finish_time = None;
        return Ok(Transition::unchanged_counters(next));
    };

    if next.name != previous.name {
        return Err(LifecycleError::Immutable { field: "name" });
    }
    if next.associated_pod != previous.associated_pod {
        return Err(LifecycleError::Immutable {
            field: "associatedPod",
        });
    }

    let promoted = origin == Origin::Admission || previous.queue_status == QueueStatus::Active;
    if next.queue_status == QueueStatus::Active
        && (!promoted || previous.instance_running_finish_time.is_some())
    {
        next.queue_status = QueueStatus::Queued;
    }

    let entered = next.queue_status != previous.queue_status;
    match next.queue_status {
        QueueStatus::Queued => {
            if entered || next.queuing_start_time.is_none() {
                next.queuing_start_time = Some(now);
            }
            next.instance_running_start_time = None;
            next.instance_running_finish_time = None;
            Ok(Transition::unchanged_counters(next))
        }
        QueueStatus::Active => {
            if entered || next.instance_running_start_time.is_none() {
                next.instance_running_start_time = Some(now);
            }
            next.instance_running_finish_time = None;
            Ok(Transition::unchanged_counters(next))
        }
        terminal => {
            if !entered {
                return Ok(Transition::unchanged_counters(next));
            }
            if next.instance_running_start_time.is_none() {
                next.instance_running_start_time = Some(now);
            }
            next.instance_running_finish_time = Some(now);
            let counter = PodCounter::for_outcome(next.job_type, terminal);
            Ok(Transition {
                deployment: next,
                counter,
            })
        }
    }
}

//! Timeout supervision: expiring Active deployments that overran their budget.

use chrono::{DateTime, Utc};
use oqs_audit::Actor;
use tracing::{info, instrument, warn};

use super::report::error_summary;
use super::{Engine, EngineError, SweepKind, SweepReport, SweepStats, Trigger};
use crate::model::{Deployment, QueueStatus};

/// Budget used when the owning pod does not declare the deployment's product.
pub const FALLBACK_TIMEOUT_MINUTES: u32 = 120;

/// Where a deployment's timeout budget came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    Custom(u32),
    Product(u32),
    Fallback,
}

impl Budget {
    fn minutes(&self) -> u32 {
        match self {
            Budget::Custom(m) | Budget::Product(m) => *m,
            Budget::Fallback => FALLBACK_TIMEOUT_MINUTES,
        }
    }
}

/// Minutes elapsed between `start` and `now`, with sub-minute precision.
fn minutes_running(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - start).num_milliseconds() as f64 / 60_000.0
}

impl Engine {
    /// Sets every Active deployment that ran past its budget to Timed-Out.
    ///
    /// Failures are collected per deployment; one failing deployment does not
    /// stop the others from being checked.
    #[instrument(skip(self))]
    pub async fn handle_deployment_timeouts(&self, trigger: Trigger) -> SweepReport {
        let header = trigger.header(SweepKind::Timeouts);
        let mut stats = SweepStats::default();

        let running = match self.writer.store().deployments().find_running().await {
            Ok(running) => running,
            Err(e) => {
                return SweepReport::new(
                    format!("{header}Failure. Error finding Active Deployments."),
                    Some(e.to_string()),
                    stats,
                );
            }
        };

        let mut narrative = String::new();
        if running.is_empty() {
            narrative.push_str("No active Deployments exist.");
        }

        let mut errors = Vec::new();
        for deployment in &running {
            stats.processed += 1;
            narrative.push_str(&format!("\nFor Deployment {}: ", deployment.name));
            match self.expire_if_overdue(deployment, &mut narrative).await {
                Ok(true) => stats.changed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(deployment = %deployment.name, error = %e, "Timeout check failed");
                    stats.failed += 1;
                    errors.push(format!("Deployment '{}': {e}", deployment.name));
                }
            }
        }

        info!(
            processed = stats.processed,
            timed_out = stats.changed,
            failed = stats.failed,
            "Timeout sweep complete"
        );

        let verdict = if errors.is_empty() { "Success" } else { "Failure" };
        SweepReport::new(
            format!("{header}{verdict}. {narrative}"),
            error_summary(&errors),
            stats,
        )
    }

    /// Returns true if the deployment was set to Timed-Out.
    async fn expire_if_overdue(
        &self,
        deployment: &Deployment,
        narrative: &mut String,
    ) -> Result<bool, EngineError> {
        let Some(started) = deployment.instance_running_start_time else {
            return Ok(false);
        };
        let minutes = minutes_running(started, self.writer.clock().now());
        let budget = self.timeout_budget(deployment).await?;

        let detail = match budget {
            Budget::Custom(limit) => format!(
                "Job is using custom timeout value. Running for {minutes:.2}/{limit} minutes. "
            ),
            Budget::Product(limit) => format!(
                "Job is using specific timeout value for Product {}. Running for {minutes:.2}/{limit} minutes. ",
                deployment.product
            ),
            Budget::Fallback => format!(
                "Job is using fallback timeout value for Product {}. Running for {minutes:.2}/{FALLBACK_TIMEOUT_MINUTES} minutes. ",
                deployment.product
            ),
        };
        narrative.push_str(&detail);

        if minutes < f64::from(budget.minutes()) {
            return Ok(false);
        }

        let mut expired = deployment.clone();
        expired.queue_status = QueueStatus::TimedOut;
        self.writer
            .save_deployment(Some(deployment), expired, &Actor::System)
            .await
            .map_err(|source| EngineError::StatusUpdate {
                status: QueueStatus::TimedOut,
                source,
            })?;
        narrative.push_str("Successfully set Queue-Status to 'Timed-Out'.");
        Ok(true)
    }

    /// Custom timeout first, then the owning pod's per-product value.
    ///
    /// A pod that declares no products at all, or declares the product with
    /// no timeout value, is an error. A pod that declares other products but
    /// not this one falls back to [`FALLBACK_TIMEOUT_MINUTES`].
    async fn timeout_budget(&self, deployment: &Deployment) -> Result<Budget, EngineError> {
        if let Some(custom) = deployment.custom_timeout {
            return Ok(Budget::Custom(custom));
        }

        let pod = self
            .writer
            .store()
            .pods()
            .get(deployment.associated_pod.as_str())
            .await?
            .ok_or_else(|| EngineError::PodNotFound(deployment.associated_pod.clone()))?;

        if pod.products.is_empty() {
            return Err(EngineError::NoTimeoutValue);
        }
        match pod.product(&deployment.product) {
            Some(product) => product
                .timeout_value
                .map(Budget::Product)
                .ok_or(EngineError::NoTimeoutValue),
            None => Ok(Budget::Fallback),
        }
    }
}

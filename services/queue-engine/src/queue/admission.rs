//! Admission: promoting queued deployments onto a pod within its tolerance.

use oqs_audit::Actor;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::report::{error_summary, generate_response_string, join};
use super::{Engine, EngineError, SweepKind, SweepReport, SweepStats, Trigger};
use crate::load::{active_load, fits, load_of};
use crate::model::{Deployment, DeploymentName, Pod, PodName, QueueStatus};

/// Result of one admission pass over a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOutcome {
    pub queue_message: String,
    #[serde(skip)]
    pub admitted: Vec<DeploymentName>,
    #[serde(skip)]
    pub still_queued: Vec<DeploymentName>,
    #[serde(skip)]
    pub not_found: Vec<DeploymentName>,
}

impl QueueOutcome {
    fn message_only(queue_message: String) -> Self {
        Self {
            queue_message,
            admitted: Vec::new(),
            still_queued: Vec::new(),
            not_found: Vec::new(),
        }
    }
}

/// Result of linking a deployment into its parent pod.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodLink {
    pub pod_status: String,
    #[serde(rename = "podObject", skip_serializing_if = "Option::is_none")]
    pub pod: Option<Pod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Engine {
    /// Admits as many queued deployments of `pod` as fit, oldest first.
    ///
    /// When `just_updated` names one of the queued deployments, that
    /// in-memory copy is the one promoted instead of the stored document.
    #[instrument(skip(self, pod, just_updated), fields(pod = %pod.name))]
    pub async fn handle_pod_queue(
        &self,
        pod: &Pod,
        just_updated: Option<&Deployment>,
    ) -> Result<QueueOutcome, EngineError> {
        if !pod.queue_enabled {
            return Ok(QueueOutcome::message_only(format!(
                "Queuing must be enabled for Pod {} before handling.",
                pod.name
            )));
        }
        if pod.deployments.is_empty() {
            return Ok(QueueOutcome::message_only(format!(
                "There are no deployments for {} to handle.",
                pod.name
            )));
        }

        let mut found = self
            .writer
            .store()
            .deployments()
            .find_by_names(&pod.deployments)
            .await?;
        found.sort_by_key(|d| d.queuing_start_time);

        let not_found: Vec<DeploymentName> = pod
            .deployments
            .iter()
            .filter(|name| !found.iter().any(|d| &d.name == *name))
            .cloned()
            .collect();

        let mut current_load = active_load(pod, &found);
        let mut admitted = Vec::new();
        let mut still_queued = Vec::new();

        for stored in found.iter().filter(|d| d.queue_status == QueueStatus::Queued) {
            let load = load_of(&stored.product, pod);
            if !fits(pod, current_load, load) {
                still_queued.push(stored.name.clone());
                continue;
            }

            let next = match just_updated {
                Some(fresh) if fresh.name == stored.name => fresh.clone(),
                _ => stored.clone(),
            };
            self.writer.admit_deployment(stored, next).await?;

            current_load += u64::from(load);
            admitted.push(stored.name.clone());
        }

        info!(
            admitted = admitted.len(),
            still_queued = still_queued.len(),
            not_found = not_found.len(),
            current_load,
            tolerance = pod.load_tolerance(),
            "Queue handling complete"
        );

        let mut detail =
            generate_response_string("Deployment", "set to Active", &admitted, &not_found, &[]);
        if !still_queued.is_empty() {
            detail.push_str(&format!(
                "\nDeployments still queued: {}.",
                join(&still_queued)
            ));
        }
        if detail.is_empty() {
            detail.push_str("\nThere are no deployments within the queue.");
        }

        Ok(QueueOutcome {
            queue_message: format!("Queue-Handling for Pod {}.{}", pod.name, detail),
            admitted,
            still_queued,
            not_found,
        })
    }

    /// Adds `deployment` to the deployment list of `pod_name`, creating the
    /// pod if it does not exist. Failures are reported, never raised.
    #[instrument(skip(self, deployment), fields(deployment = %deployment.name, pod = %pod_name))]
    pub async fn handle_add_deployment_to_parent_pod(
        &self,
        deployment: &Deployment,
        pod_name: &PodName,
    ) -> PodLink {
        match self.link_into_pod(deployment, pod_name).await {
            Ok(pod) => PodLink {
                pod_status: format!(
                    "Successfully updated Pod {pod_name} with {} details.",
                    deployment.name
                ),
                pod: Some(pod),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Failed to link deployment into parent pod");
                PodLink {
                    pod_status: format!(
                        "Error: Failed to update Pod {pod_name} with {} details.",
                        deployment.name
                    ),
                    pod: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn link_into_pod(
        &self,
        deployment: &Deployment,
        pod_name: &PodName,
    ) -> Result<Pod, EngineError> {
        let (stored, mut pod) = self.writer.load_or_new_pod(pod_name).await?;
        pod.link_deployment(&deployment.name);
        let pod = self
            .writer
            .save_pod(stored.as_ref(), pod, &Actor::System)
            .await?;
        Ok(pod)
    }

    /// Runs admission for every pod in turn.
    ///
    /// A failure on one pod is recorded and the remaining pods still run.
    #[instrument(skip(self))]
    pub async fn handle_deployment_start(&self, trigger: Trigger) -> SweepReport {
        let header = trigger.header(SweepKind::DeploymentStart);
        let mut stats = SweepStats::default();

        let pods = match self.writer.store().pods().list().await {
            Ok(pods) => pods,
            Err(e) => {
                let errors = vec![format!("Error starting Deployments. {e}")];
                return SweepReport::new(format!("{header}Failure."), error_summary(&errors), stats);
            }
        };

        let mut errors = Vec::new();
        for pod in &pods {
            stats.processed += 1;
            match self.handle_pod_queue(pod, None).await {
                Ok(outcome) => {
                    stats.changed += outcome.admitted.len();
                    stats.not_found += outcome.not_found.len();
                }
                Err(e) => {
                    stats.failed += 1;
                    errors.push(format!("Error starting Deployments for Pod {}. {e}", pod.name));
                }
            }
        }

        let verdict = if errors.is_empty() { "Success" } else { "Failure" };
        SweepReport::new(format!("{header}{verdict}."), error_summary(&errors), stats)
    }
}

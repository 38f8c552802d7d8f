//! Relationship repair: re-linking deployments missing from every pod.

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use super::report::{error_summary, generate_response_string};
use super::{Engine, SweepKind, SweepReport, SweepStats, Trigger};
use crate::model::{Deployment, DeploymentName, Pod};

/// Names of deployments that no pod lists, in `deployments` order.
pub(crate) fn unlinked_deployments(deployments: &[Deployment], pods: &[Pod]) -> Vec<DeploymentName> {
    let linked: HashSet<&str> = pods
        .iter()
        .flat_map(|pod| pod.deployments.iter().map(DeploymentName::as_str))
        .collect();

    let mut seen = HashSet::new();
    deployments
        .iter()
        .map(|d| &d.name)
        .filter(|name| !linked.contains(name.as_str()) && seen.insert(name.as_str()))
        .cloned()
        .collect()
}

impl Engine {
    /// Adds every deployment that no pod lists back into its declared pod.
    #[instrument(skip(self))]
    pub async fn handle_relationship_verification(&self, trigger: Trigger) -> SweepReport {
        let header = trigger.header(SweepKind::Relationships);
        let mut stats = SweepStats::default();
        let store = self.writer.store();

        let loaded = async {
            let deployments = store.deployments().list().await?;
            let pods = store.pods().list().await?;
            Ok::<_, crate::store::StoreError>((deployments, pods))
        }
        .await;
        let (deployments, pods) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                return SweepReport::new(
                    format!("{header}(Error) Failed to find Pods/Deployments."),
                    Some(e.to_string()),
                    stats,
                );
            }
        };

        let unlinked = unlinked_deployments(&deployments, &pods);
        if unlinked.is_empty() {
            return SweepReport::new(
                format!("{header}No relationships need to be re-associated."),
                None,
                stats,
            );
        }

        let mut successes = Vec::new();
        let mut not_found = Vec::new();
        let mut failures = Vec::new();
        let mut errors = Vec::new();

        for name in unlinked {
            stats.processed += 1;
            let deployment = match store.deployments().get(name.as_str()).await {
                Ok(Some(deployment)) => deployment,
                Ok(None) => {
                    stats.not_found += 1;
                    not_found.push(name);
                    continue;
                }
                Err(e) => {
                    stats.failed += 1;
                    errors.push(format!("Deployment '{name}': {e}"));
                    failures.push(name);
                    continue;
                }
            };

            let link = self
                .handle_add_deployment_to_parent_pod(&deployment, &deployment.associated_pod)
                .await;
            match (link.pod, link.error) {
                (Some(_), _) => {
                    stats.changed += 1;
                    successes.push(name);
                }
                (None, error) => {
                    warn!(deployment = %name, pod = %deployment.associated_pod, "Re-association failed");
                    stats.failed += 1;
                    errors.push(format!(
                        "Deployment '{name}': {}",
                        error.unwrap_or(link.pod_status)
                    ));
                    failures.push(name);
                }
            }
        }

        info!(
            processed = stats.processed,
            re_associated = stats.changed,
            not_found = stats.not_found,
            failed = stats.failed,
            "Relationship verification complete"
        );

        let detail =
            generate_response_string("Deployment", "re-associate", &successes, &not_found, &failures);
        SweepReport::new(format!("{header}{detail}"), error_summary(&errors), stats)
    }
}

use oqs_audit::Actor;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{DocumentFilter, ServiceError, DUPLICATE_NAME};
use crate::lifecycle::LifecycleError;
use crate::model::{Deployment, DeploymentPatch, NewDeployment, ValidationError};
use crate::queue::{Engine, PodLink, QueueOutcome};

/// Message for an update whose parent pod is missing.
pub const PARENT_POD_NOT_FOUND: &str =
    "Associated Parent-Pod could not be found for queue-handling.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCreated {
    pub new_deployment: Deployment,
    #[serde(flatten)]
    pub pod_link: PodLink,
    #[serde(flatten)]
    pub queue: Option<QueueOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentUpdated {
    pub updated_deployment: Deployment,
    pub queue_message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDeleted {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_message: Option<String>,
}

/// Create, update and delete for deployments.
#[derive(Debug, Clone)]
pub struct DeploymentService {
    engine: Engine,
}

impl DeploymentService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub async fn list(&self) -> Result<Vec<Deployment>, ServiceError> {
        Ok(self.engine.writer().store().deployments().list().await?)
    }

    pub async fn search(&self, filter: &DocumentFilter) -> Result<Vec<Deployment>, ServiceError> {
        Ok(filter.apply(self.list().await?))
    }

    pub async fn get(&self, name: &str) -> Result<Deployment, ServiceError> {
        self.engine
            .writer()
            .store()
            .deployments()
            .get(name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Deployment", name))
    }

    /// Persists a new Queued deployment, links it into its parent pod and
    /// runs admission for that pod.
    #[instrument(skip(self, request, actor), fields(deployment = %request.name))]
    pub async fn create(
        &self,
        request: NewDeployment,
        actor: &Actor,
    ) -> Result<DeploymentCreated, ServiceError> {
        let draft = request.into_deployment()?;
        let writer = self.engine.writer();
        if writer
            .store()
            .deployments()
            .get(draft.name.as_str())
            .await?
            .is_some()
        {
            return Err(ServiceError::Validation(DUPLICATE_NAME.to_string()));
        }
        self.check_product(&draft.product).await?;

        let saved = writer.save_deployment(None, draft, actor).await?;
        let pod_link = self
            .engine
            .handle_add_deployment_to_parent_pod(&saved, &saved.associated_pod)
            .await;
        let queue = match &pod_link.pod {
            Some(pod) => Some(self.engine.handle_pod_queue(pod, Some(&saved)).await?),
            None => None,
        };

        info!(pod = %saved.associated_pod, "Deployment created");
        Ok(DeploymentCreated {
            new_deployment: saved,
            pod_link,
            queue,
        })
    }

    /// Applies `patch` and re-runs admission for the parent pod.
    #[instrument(skip(self, patch, actor))]
    pub async fn update(
        &self,
        name: &str,
        patch: DeploymentPatch,
        actor: &Actor,
    ) -> Result<DeploymentUpdated, ServiceError> {
        let current = self.get(name).await?;
        if let Some(field) = patch.immutable_violation(&current) {
            return Err(LifecycleError::Immutable { field }.into());
        }

        let next = patch.apply(&current);
        if next.product != current.product {
            self.check_product(&next.product).await?;
        }

        let writer = self.engine.writer();
        let saved = writer.save_deployment(Some(&current), next, actor).await?;

        let parent = writer
            .store()
            .pods()
            .get(saved.associated_pod.as_str())
            .await?;
        let queue_message = match parent {
            Some(pod) => self.engine.handle_pod_queue(&pod, None).await?.queue_message,
            None => PARENT_POD_NOT_FOUND.to_string(),
        };

        Ok(DeploymentUpdated {
            updated_deployment: saved,
            queue_message,
        })
    }

    /// Rejects a product the configuration catalog does not declare. With no
    /// configuration there is nothing to check against.
    async fn check_product(&self, product: &str) -> Result<(), ServiceError> {
        let configuration = self
            .engine
            .writer()
            .store()
            .configurations()
            .active()
            .await?;
        match configuration {
            Some(configuration) if !configuration.declares(product) => {
                Err(ValidationError::UnknownProduct(product.to_string()).into())
            }
            _ => Ok(()),
        }
    }

    /// Removes a deployment, unlinks it from its parent pod and re-runs
    /// admission there.
    ///
    /// Once the deployment itself is removed the call succeeds; problems
    /// with the parent pod are reported in the message.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, name: &str, actor: &Actor) -> Result<DeploymentDeleted, ServiceError> {
        let current = self.get(name).await?;
        let writer = self.engine.writer();
        writer.remove_deployment(&current, actor).await?;

        let pod_name = &current.associated_pod;
        let parent = match writer.store().pods().get(pod_name.as_str()).await {
            Ok(parent) => parent,
            Err(e) => return Ok(Self::deleted_with_pod_error(&e)),
        };
        let Some(parent) = parent else {
            warn!(pod = %pod_name, "Parent pod of deleted deployment not found");
            return Ok(DeploymentDeleted {
                message: format!(
                    "Deployment deleted successfully.\nError whilst updating Parent-Pod: {pod_name} does not correspond to a known Pod."
                ),
                queue_message: None,
            });
        };

        let mut next = parent.clone();
        next.unlink_deployment(current.name.as_str());
        let saved = match writer.save_pod(Some(&parent), next, actor).await {
            Ok(saved) => saved,
            Err(e) => return Ok(Self::deleted_with_pod_error(&e)),
        };
        let queue = match self.engine.handle_pod_queue(&saved, None).await {
            Ok(queue) => queue,
            Err(e) => return Ok(Self::deleted_with_pod_error(&e)),
        };

        Ok(DeploymentDeleted {
            message: "Deployment deleted successfully.\nParent-Pod updated successfully.".to_string(),
            queue_message: Some(queue.queue_message),
        })
    }

    fn deleted_with_pod_error(error: &dyn std::error::Error) -> DeploymentDeleted {
        warn!(error = %error, "Failed to update parent pod after deployment delete");
        DeploymentDeleted {
            message: format!("Deployment deleted successfully.\nError whilst updating Pod: {error}"),
            queue_message: None,
        }
    }
}

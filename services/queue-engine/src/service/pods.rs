use oqs_audit::Actor;
use serde::Serialize;
use tracing::instrument;

use super::{DocumentFilter, ServiceError, DUPLICATE_NAME};
use crate::capacity::CapacityError;
use crate::model::{NewPod, Pod, PodPatch};
use crate::queue::Engine;

/// Message for a pod delete blocked by linked deployments.
pub const POD_HAS_DEPLOYMENTS: &str = "This Pod has dependant Deployments so cannot be deleted";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodUpdated {
    pub updated_pod: Pod,
    pub queue_message: String,
}

/// Create, update and delete for pods.
#[derive(Debug, Clone)]
pub struct PodService {
    engine: Engine,
}

impl PodService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub async fn list(&self) -> Result<Vec<Pod>, ServiceError> {
        Ok(self.engine.writer().store().pods().list().await?)
    }

    pub async fn search(&self, filter: &DocumentFilter) -> Result<Vec<Pod>, ServiceError> {
        Ok(filter.apply(self.list().await?))
    }

    pub async fn get(&self, name: &str) -> Result<Pod, ServiceError> {
        self.engine
            .writer()
            .store()
            .pods()
            .get(name)
            .await?
            .ok_or_else(|| ServiceError::not_found("Pod", name))
    }

    #[instrument(skip(self, request, actor), fields(pod = %request.name))]
    pub async fn create(&self, request: NewPod, actor: &Actor) -> Result<Pod, ServiceError> {
        let pod = request.into_pod()?;
        let writer = self.engine.writer();
        if writer.store().pods().get(pod.name.as_str()).await?.is_some() {
            return Err(ServiceError::Validation(DUPLICATE_NAME.to_string()));
        }
        Ok(writer.save_pod(None, pod, actor).await?)
    }

    /// Applies `patch` and re-runs admission, since capacity or
    /// `queueEnabled` may have changed.
    #[instrument(skip(self, patch, actor))]
    pub async fn update(
        &self,
        name: &str,
        patch: PodPatch,
        actor: &Actor,
    ) -> Result<PodUpdated, ServiceError> {
        let current = self.get(name).await?;
        if let Some(field) = patch.immutable_violation(&current) {
            return Err(CapacityError::Immutable { field }.into());
        }

        let saved = self
            .engine
            .writer()
            .save_pod(Some(&current), patch.apply(&current), actor)
            .await?;
        let queue = self.engine.handle_pod_queue(&saved, None).await?;

        Ok(PodUpdated {
            updated_pod: saved,
            queue_message: queue.queue_message,
        })
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, name: &str, actor: &Actor) -> Result<(), ServiceError> {
        let current = self.get(name).await?;
        if !current.deployments.is_empty() {
            return Err(ServiceError::Precondition(POD_HAS_DEPLOYMENTS.to_string()));
        }
        self.engine.writer().remove_pod(&current, actor).await?;
        Ok(())
    }
}

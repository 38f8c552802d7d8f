use oqs_audit::Actor;
use tracing::instrument;

use super::{DocumentFilter, ServiceError, DUPLICATE_NAME};
use crate::model::{Configuration, ConfigurationPatch};
use crate::queue::Engine;

/// Message for a create while a configuration already exists.
pub const SINGLE_CONFIGURATION: &str =
    "Only 1 Configuration is currently supported, edit existing one";

/// Create, update and delete for the singleton configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationService {
    engine: Engine,
}

impl ConfigurationService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub async fn list(&self) -> Result<Vec<Configuration>, ServiceError> {
        Ok(self
            .engine
            .writer()
            .store()
            .configurations()
            .list()
            .await?)
    }

    pub async fn search(&self, filter: &DocumentFilter) -> Result<Vec<Configuration>, ServiceError> {
        Ok(filter.apply(self.list().await?))
    }

    pub async fn get(&self, name: &str) -> Result<Configuration, ServiceError> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ServiceError::not_found("Configuration", name))
    }

    #[instrument(skip(self, configuration, actor), fields(configuration = %configuration.name))]
    pub async fn create(
        &self,
        configuration: Configuration,
        actor: &Actor,
    ) -> Result<Configuration, ServiceError> {
        configuration.validate()?;
        let existing = self.list().await?;
        if existing.iter().any(|c| c.name == configuration.name) {
            return Err(ServiceError::Validation(DUPLICATE_NAME.to_string()));
        }
        if !existing.is_empty() {
            return Err(ServiceError::Precondition(SINGLE_CONFIGURATION.to_string()));
        }
        Ok(self
            .engine
            .writer()
            .save_configuration(None, configuration, actor)
            .await?)
    }

    /// Applies `patch`. Pods pick up catalog changes on their next save.
    #[instrument(skip(self, patch, actor))]
    pub async fn update(
        &self,
        name: &str,
        patch: ConfigurationPatch,
        actor: &Actor,
    ) -> Result<Configuration, ServiceError> {
        let current = self.get(name).await?;
        if let Some(field) = patch.immutable_violation(&current) {
            return Err(ServiceError::Validation(format!(
                "Configuration '{field}' field is immutable and cannot be modified."
            )));
        }
        let next = patch.apply(&current);
        next.validate()?;
        Ok(self
            .engine
            .writer()
            .save_configuration(Some(&current), next, actor)
            .await?)
    }

    /// Removes the configuration. Pods keep their catalog until their next
    /// save, which then fails until a new configuration is created.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, name: &str, actor: &Actor) -> Result<(), ServiceError> {
        let current = self.get(name).await?;
        if !self
            .engine
            .writer()
            .remove_configuration(&current, actor)
            .await?
        {
            return Err(ServiceError::not_found("Configuration", name));
        }
        Ok(())
    }
}

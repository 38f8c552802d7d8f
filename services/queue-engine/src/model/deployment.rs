use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeploymentName, PodName, ValidationError};

/// Product assigned to deployments created without one.
pub const DEFAULT_PRODUCT: &str = "vENM";

/// Bounds for `customTimeout`, in minutes.
pub const CUSTOM_TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=999;

/// Kind of job a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobType {
    #[default]
    Install,
    Upgrade,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Install => write!(f, "Install"),
            JobType::Upgrade => write!(f, "Upgrade"),
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Install" => Ok(JobType::Install),
            "Upgrade" => Ok(JobType::Upgrade),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

/// Position of a deployment in the queue lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QueueStatus {
    #[default]
    Queued,
    Active,
    Finished,
    Failed,
    #[serde(rename = "Timed-Out")]
    TimedOut,
}

impl QueueStatus {
    /// Returns true for states a deployment only reaches by leaving Active.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Active => "Active",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
            Self::TimedOut => "Timed-Out",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(Self::Queued),
            "Active" => Ok(Self::Active),
            "Finished" => Ok(Self::Finished),
            "Failed" => Ok(Self::Failed),
            "Timed-Out" => Ok(Self::TimedOut),
            other => Err(format!("unknown queue status: {other}")),
        }
    }
}

/// A unit of work targeting one pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub name: DeploymentName,
    pub associated_pod: PodName,
    #[serde(default)]
    pub job_type: JobType,
    #[serde(default)]
    pub queue_status: QueueStatus,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_set: Option<String>,
    #[serde(default)]
    pub queuing_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instance_running_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instance_running_finish_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_timeout: Option<u32>,
}

impl Deployment {
    /// Creates an unsaved Install deployment in the Queued state.
    pub fn new(name: DeploymentName, associated_pod: PodName, product: impl Into<String>) -> Self {
        Self {
            name,
            associated_pod,
            job_type: JobType::default(),
            queue_status: QueueStatus::default(),
            product: product.into(),
            product_set: None,
            queuing_start_time: None,
            instance_running_start_time: None,
            instance_running_finish_time: None,
            custom_timeout: None,
        }
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    pub fn with_custom_timeout(mut self, minutes: u32) -> Self {
        self.custom_timeout = Some(minutes);
        self
    }

    /// Returns true if the deployment is Active with a recorded start time.
    pub fn is_running(&self) -> bool {
        self.queue_status == QueueStatus::Active && self.instance_running_start_time.is_some()
    }

    /// Checks field-level constraints that do not depend on other entities.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.product.trim().is_empty() {
            return Err(ValidationError::Required("product"));
        }
        if let Some(minutes) = self.custom_timeout {
            if !CUSTOM_TIMEOUT_RANGE.contains(&minutes) {
                return Err(ValidationError::CustomTimeout(minutes));
            }
        }
        Ok(())
    }
}

/// Creation request for a deployment, before name validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeployment {
    pub name: String,
    pub associated_pod: String,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub product_set: Option<String>,
    #[serde(default)]
    pub custom_timeout: Option<u32>,
}

impl NewDeployment {
    pub fn new(name: impl Into<String>, associated_pod: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            associated_pod: associated_pod.into(),
            ..Default::default()
        }
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn custom_timeout(mut self, minutes: u32) -> Self {
        self.custom_timeout = Some(minutes);
        self
    }

    /// Validates names and builds the unsaved deployment.
    pub fn into_deployment(self) -> Result<Deployment, ValidationError> {
        let name = DeploymentName::parse(&self.name)?;
        let pod = PodName::parse(&self.associated_pod)?;
        let product = self.product.unwrap_or_else(|| DEFAULT_PRODUCT.to_string());

        let mut deployment = Deployment::new(name, pod, product);
        deployment.job_type = self.job_type.unwrap_or_default();
        deployment.product_set = self.product_set;
        deployment.custom_timeout = self.custom_timeout;
        deployment.validate()?;
        Ok(deployment)
    }
}

/// Partial update of a deployment.
///
/// `name` and `associated_pod` are accepted only so a change to them can be
/// rejected as an immutable-field violation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub associated_pod: Option<String>,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub queue_status: Option<QueueStatus>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub product_set: Option<String>,
    #[serde(default)]
    pub custom_timeout: Option<u32>,
}

impl DeploymentPatch {
    pub fn queue_status(status: QueueStatus) -> Self {
        Self {
            queue_status: Some(status),
            ..Default::default()
        }
    }

    /// Returns the first immutable field this patch would change.
    pub fn immutable_violation(&self, current: &Deployment) -> Option<&'static str> {
        if let Some(name) = &self.name {
            if name.trim() != current.name.as_str() {
                return Some("name");
            }
        }
        if let Some(pod) = &self.associated_pod {
            if pod.trim() != current.associated_pod.as_str() {
                return Some("associatedPod");
            }
        }
        None
    }

    /// Applies the mutable fields onto a copy of `current`.
    pub fn apply(&self, current: &Deployment) -> Deployment {
        let mut next = current.clone();
        if let Some(job_type) = self.job_type {
            next.job_type = job_type;
        }
        if let Some(status) = self.queue_status {
            next.queue_status = status;
        }
        if let Some(product) = &self.product {
            next.product = product.clone();
        }
        if let Some(product_set) = &self.product_set {
            next.product_set = Some(product_set.clone());
        }
        if let Some(minutes) = self.custom_timeout {
            next.custom_timeout = Some(minutes);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> Deployment {
        Deployment::new(
            DeploymentName::parse("depl-001").unwrap(),
            PodName::parse("cloud1").unwrap(),
            "vENM",
        )
    }

    #[test]
    fn test_queue_status_serialization() {
        assert_eq!(
            serde_json::to_string(&QueueStatus::TimedOut).unwrap(),
            "\"Timed-Out\""
        );
        assert_eq!("Timed-Out".parse::<QueueStatus>().unwrap(), QueueStatus::TimedOut);
        assert!(QueueStatus::Failed.is_terminal());
        assert!(!QueueStatus::Active.is_terminal());
    }

    #[test]
    fn test_deployment_serializes_camel_case() {
        let json = serde_json::to_value(deployment()).unwrap();
        assert_eq!(json["associatedPod"], "cloud1");
        assert_eq!(json["queueStatus"], "Queued");
        assert_eq!(json["jobType"], "Install");
    }

    #[test]
    fn test_custom_timeout_bounds() {
        assert!(deployment().with_custom_timeout(1).validate().is_ok());
        assert!(deployment().with_custom_timeout(999).validate().is_ok());
        assert_eq!(
            deployment().with_custom_timeout(0).validate(),
            Err(ValidationError::CustomTimeout(0))
        );
        assert!(deployment().with_custom_timeout(1000).validate().is_err());
    }

    #[test]
    fn test_new_deployment_defaults() {
        let d = NewDeployment::new("depl-001", "cloud1").into_deployment().unwrap();
        assert_eq!(d.product, DEFAULT_PRODUCT);
        assert_eq!(d.job_type, JobType::Install);
        assert_eq!(d.queue_status, QueueStatus::Queued);
    }

    #[test]
    fn test_new_deployment_rejects_bad_pod_name() {
        let err = NewDeployment::new("depl-001", "pod").into_deployment().unwrap_err();
        assert!(matches!(err, ValidationError::Name(_)));
    }

    #[test]
    fn test_patch_immutable_fields() {
        let current = deployment();
        let same = DeploymentPatch {
            name: Some("depl-001".into()),
            ..Default::default()
        };
        assert_eq!(same.immutable_violation(&current), None);

        let moved = DeploymentPatch {
            associated_pod: Some("cloud2".into()),
            ..Default::default()
        };
        assert_eq!(moved.immutable_violation(&current), Some("associatedPod"));
    }

    #[test]
    fn test_patch_apply() {
        let next = DeploymentPatch {
            queue_status: Some(QueueStatus::Finished),
            custom_timeout: Some(30),
            ..Default::default()
        }
        .apply(&deployment());
        assert_eq!(next.queue_status, QueueStatus::Finished);
        assert_eq!(next.custom_timeout, Some(30));
        assert_eq!(next.product, "vENM");
    }
}

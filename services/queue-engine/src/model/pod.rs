use serde::{Deserialize, Serialize};

use super::{DeploymentName, JobType, PodName, QueueStatus, ValidationError, ALL_PRODUCTS};

/// Per-pod settings for one catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub load_value: Option<u32>,
    #[serde(default)]
    pub timeout_value: Option<u32>,
}

impl Product {
    pub fn new(name: impl Into<String>, load_value: u32, timeout_value: u32) -> Self {
        Self {
            name: name.into(),
            load_value: Some(load_value),
            timeout_value: Some(timeout_value),
        }
    }

    /// A product entry whose values are filled from the catalog on create.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load_value: None,
            timeout_value: None,
        }
    }
}

/// Running totals of terminal outcomes for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodCounters {
    #[serde(default)]
    pub total_install_successes: u64,
    #[serde(default)]
    pub total_install_failures: u64,
    #[serde(default)]
    pub total_install_timeouts: u64,
    #[serde(default)]
    pub total_upgrade_successes: u64,
    #[serde(default)]
    pub total_upgrade_failures: u64,
    #[serde(default)]
    pub total_upgrade_timeouts: u64,
}

/// One of the six outcome counters on a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodCounter {
    InstallSuccesses,
    InstallFailures,
    InstallTimeouts,
    UpgradeSuccesses,
    UpgradeFailures,
    UpgradeTimeouts,
}

impl PodCounter {
    /// Counter for a job of `job_type` reaching `status`, if it is terminal.
    pub fn for_outcome(job_type: JobType, status: QueueStatus) -> Option<Self> {
        let counter = match (job_type, status) {
            (JobType::Install, QueueStatus::Finished) => Self::InstallSuccesses,
            (JobType::Install, QueueStatus::Failed) => Self::InstallFailures,
            (JobType::Install, QueueStatus::TimedOut) => Self::InstallTimeouts,
            (JobType::Upgrade, QueueStatus::Finished) => Self::UpgradeSuccesses,
            (JobType::Upgrade, QueueStatus::Failed) => Self::UpgradeFailures,
            (JobType::Upgrade, QueueStatus::TimedOut) => Self::UpgradeTimeouts,
            (_, QueueStatus::Queued | QueueStatus::Active) => return None,
        };
        Some(counter)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstallSuccesses => "totalInstallSuccesses",
            Self::InstallFailures => "totalInstallFailures",
            Self::InstallTimeouts => "totalInstallTimeouts",
            Self::UpgradeSuccesses => "totalUpgradeSuccesses",
            Self::UpgradeFailures => "totalUpgradeFailures",
            Self::UpgradeTimeouts => "totalUpgradeTimeouts",
        }
    }
}

impl PodCounters {
    pub fn increment(&mut self, counter: PodCounter) {
        let field = match counter {
            PodCounter::InstallSuccesses => &mut self.total_install_successes,
            PodCounter::InstallFailures => &mut self.total_install_failures,
            PodCounter::InstallTimeouts => &mut self.total_install_timeouts,
            PodCounter::UpgradeSuccesses => &mut self.total_upgrade_successes,
            PodCounter::UpgradeFailures => &mut self.total_upgrade_failures,
            PodCounter::UpgradeTimeouts => &mut self.total_upgrade_timeouts,
        };
        *field = field.saturating_add(1);
    }
}

fn default_true() -> bool {
    true
}

fn default_product_type() -> Vec<String> {
    vec![ALL_PRODUCTS.to_string()]
}

/// A capacity-bounded execution target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub name: PodName,
    #[serde(default = "default_true")]
    pub queue_enabled: bool,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pod_load_tolerance: Option<u32>,
    #[serde(default)]
    pub deployments: Vec<DeploymentName>,
    #[serde(default = "default_product_type")]
    pub product_type: Vec<String>,
    #[serde(flatten)]
    pub counters: PodCounters,
}

impl Pod {
    /// Creates an unsaved pod with queuing enabled and no products.
    ///
    /// Products and load tolerance are filled from the configuration when
    /// the pod is first persisted.
    pub fn new(name: PodName) -> Self {
        Self {
            name,
            queue_enabled: true,
            products: Vec::new(),
            pod_load_tolerance: None,
            deployments: Vec::new(),
            product_type: default_product_type(),
            counters: PodCounters::default(),
        }
    }

    pub fn with_load_tolerance(mut self, tolerance: u32) -> Self {
        self.pod_load_tolerance = Some(tolerance);
        self
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    pub fn with_product_type<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.product_type = types.into_iter().map(Into::into).collect();
        self
    }

    /// Effective load tolerance; an unset tolerance admits nothing.
    pub fn load_tolerance(&self) -> u32 {
        self.pod_load_tolerance.unwrap_or(0)
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Returns true if the pod currently admits `product` against its tolerance.
    pub fn admits_product(&self, product: &str) -> bool {
        self.product_type
            .iter()
            .any(|t| t == product || t == ALL_PRODUCTS)
    }

    pub fn has_deployment(&self, name: &str) -> bool {
        self.deployments.iter().any(|d| d == name)
    }

    /// Adds a deployment reference if absent. Returns true if it was added.
    pub fn link_deployment(&mut self, name: &DeploymentName) -> bool {
        if self.has_deployment(name.as_str()) {
            return false;
        }
        self.deployments.push(name.clone());
        true
    }

    /// Removes a deployment reference. Returns true if it was present.
    pub fn unlink_deployment(&mut self, name: &str) -> bool {
        let before = self.deployments.len();
        self.deployments.retain(|d| d != name);
        self.deployments.len() != before
    }
}

/// Creation request for a pod, before name validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPod {
    pub name: String,
    #[serde(default)]
    pub queue_enabled: Option<bool>,
    #[serde(default)]
    pub products: Option<Vec<Product>>,
    #[serde(default)]
    pub pod_load_tolerance: Option<u32>,
    #[serde(default)]
    pub product_type: Option<Vec<String>>,
}

impl NewPod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_pod(self) -> Result<Pod, ValidationError> {
        let mut pod = Pod::new(PodName::parse(&self.name)?);
        if let Some(enabled) = self.queue_enabled {
            pod.queue_enabled = enabled;
        }
        if let Some(products) = self.products {
            pod.products = products;
        }
        pod.pod_load_tolerance = self.pod_load_tolerance;
        if let Some(types) = self.product_type {
            pod.product_type = types;
        }
        Ok(pod)
    }
}

/// Partial update of a pod. `name` is accepted only to reject changes to it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub queue_enabled: Option<bool>,
    #[serde(default)]
    pub products: Option<Vec<Product>>,
    #[serde(default)]
    pub pod_load_tolerance: Option<u32>,
    #[serde(default)]
    pub product_type: Option<Vec<String>>,
}

impl PodPatch {
    pub fn load_tolerance(tolerance: u32) -> Self {
        Self {
            pod_load_tolerance: Some(tolerance),
            ..Default::default()
        }
    }

    pub fn immutable_violation(&self, current: &Pod) -> Option<&'static str> {
        match &self.name {
            Some(name) if name.trim() != current.name.as_str() => Some("name"),
            _ => None,
        }
    }

    pub fn apply(&self, current: &Pod) -> Pod {
        let mut next = current.clone();
        if let Some(enabled) = self.queue_enabled {
            next.queue_enabled = enabled;
        }
        if let Some(products) = &self.products {
            next.products = products.clone();
        }
        if let Some(tolerance) = self.pod_load_tolerance {
            next.pod_load_tolerance = Some(tolerance);
        }
        if let Some(types) = &self.product_type {
            next.product_type = types.clone();
        }
        next
    }
}

//! Domain model: deployments, pods and the product configuration.
//!
//! These are plain data types. All behavior that changes them on persist
//! lives in [`crate::lifecycle`] and [`crate::capacity`].

mod configuration;
mod deployment;
mod pod;

pub use configuration::{
    CatalogProduct, Configuration, ConfigurationPatch, DEFAULT_CATALOG, DEFAULT_POD_LOAD_TOLERANCE,
    DEFAULT_PRODUCT_LOAD_VALUE, DEFAULT_PRODUCT_TIMEOUT_VALUE,
};
pub use deployment::{
    Deployment, DeploymentPatch, JobType, NewDeployment, QueueStatus, CUSTOM_TIMEOUT_RANGE,
    DEFAULT_PRODUCT,
};
pub use pod::{NewPod, Pod, PodCounter, PodCounters, PodPatch, Product};

pub use oqs_names::{ConfigurationName, DeploymentName, NameError, PodName};

use thiserror::Error;

/// Sentinel `productType` entry meaning "admit every product".
pub const ALL_PRODUCTS: &str = "All";

/// Field-level validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error("customTimeout is not valid, {0} is not an integer between 1 and 999")]
    CustomTimeout(u32),

    #[error("{0} is required")]
    Required(&'static str),

    #[error("product is not valid, '{0}' is not a product of the current Configuration")]
    UnknownProduct(String),
}

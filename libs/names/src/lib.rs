//! # oqs-names
//!
//! Validated names for the entities managed by the queue engine.
//!
//! ## Design Principles
//!
//! - Names are the identity of every entity and never change after creation
//! - Every name has one canonical form (surrounding whitespace trimmed)
//! - Names are typed so a pod name can never be passed where a deployment
//!   name is expected
//!
//! ## Name Rules
//!
//! | Type                | Length   |
//! |---------------------|----------|
//! | `DeploymentName`    | 5..=50   |
//! | `PodName`           | 5..=20   |
//! | `ConfigurationName` | 4..=20   |
//!
//! All names may only contain ASCII letters, digits, `.`, `-` and `_`.

mod error;
mod macros;
mod types;

pub use error::NameError;
pub use types::*;

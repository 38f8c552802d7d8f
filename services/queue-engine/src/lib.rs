//! OQS queue engine.
//!
//! Admission control for deployment jobs running on capacity-bounded pods:
//!
//! - [`load`]: per-product load accounting against a pod
//! - [`lifecycle`]: the deployment state machine applied on every persist
//! - [`capacity`]: pod product lists reconciled against the configuration
//! - [`queue`]: admission, timeout supervision and relationship repair
//! - [`service`]: create/update/delete paths that trigger admission
//! - [`scheduler`]: the periodic sweeps
//!
//! State lives behind the repository traits in [`store`].

pub mod api;
pub mod audit;
pub mod capacity;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod load;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod store;
pub mod writer;

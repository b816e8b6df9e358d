//! GPU catalog and capacity sizing for model-serving workloads.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! logging. Inputs are immutable snapshots, so a single catalog and
//! estimator can be shared across any number of concurrent reconcilers.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gpu::{CapacityEstimator, CloudProvider, GpuCatalog, plan_context_length};
//!
//! let catalog = Arc::new(GpuCatalog::for_cloud(CloudProvider::Aws));
//! let estimator = CapacityEstimator::new(catalog.clone());
//!
//! let nodes = estimator.estimate(Some(&profile), Some(4), "g5.12xlarge")?;
//! let capacity = catalog.lookup("g5.12xlarge")?;
//! let max_model_len = plan_context_length(&profile, capacity, 1);
//! ```

pub mod catalog;
pub mod cloud;
pub mod error;
pub mod estimator;
pub mod planner;
pub mod profile;
pub mod size;

pub use catalog::{GpuCapacity, GpuCatalog};
pub use cloud::CloudProvider;
pub use error::CapacityError;
pub use estimator::{minimum_nodes, CapacityEstimator, DEFAULT_NODE_COUNT};
pub use planner::{plan_context_length, resolve_max_model_len};
pub use profile::{ModelFamily, ModelResourceProfile};
pub use size::parse_size_to_gib;

//! GPU node acquisition for model-serving workloads.
//!
//! Turns a sized workload into Karpenter `NodeClaim`s, waits for them to
//! come up, and accounts for bring-your-own nodes already in the cluster.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use provisioner::{KubeCluster, NodeClaimOrchestrator, ProvisionerConfig, ProvisioningRequest};
//!
//! let config = ProvisionerConfig::from_env()?;
//! let cluster = Arc::new(KubeCluster::try_default().await?);
//! let orchestrator = NodeClaimOrchestrator::new(cluster, config)?;
//!
//! let claim = orchestrator.create_claim_for(&request).await?;
//! orchestrator.wait_for_ready(&claim.name_any(), &cancel).await?;
//! ```

pub mod byo;
pub mod cloud;
pub mod cluster;
pub mod config;
pub mod crds;
pub mod error;
pub mod naming;
pub mod orchestrator;
pub mod request;
pub mod retry;
pub mod status;
pub mod telemetry;

pub use byo::ByoResolver;
pub use cloud::CloudProvisioner;
pub use cluster::{ClusterApi, InMemoryCluster, KubeCluster};
pub use config::{FeatureGates, ProvisionerConfig, WaitConfig};
pub use error::{Error, ErrorClass, Result};
pub use naming::{IdSource, SequenceIdSource, UuidIdSource};
pub use orchestrator::{ClaimReadiness, ClaimSync, NodeClaimOrchestrator};
pub use request::{ProvisioningRequest, SizingPlan, WorkloadRef};
pub use status::NodeProvisioningCondition;

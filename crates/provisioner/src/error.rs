//! Error types for node acquisition

use gpu::{CapacityError, CloudProvider};
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Karpenter could not launch any of the requested instance types.
    #[error("node claim {node_claim} failed to launch instance type {instance_type}: {message}")]
    InstanceTypeUnavailable {
        node_claim: String,
        instance_type: String,
        message: String,
    },

    #[error("check node claim status timed out after {secs}s: node claim {node_claim} is not ready", secs = .waited.as_secs())]
    Timeout {
        node_claim: String,
        waited: Duration,
    },

    #[error("wait for node claim {node_claim} cancelled")]
    Cancelled { node_claim: String },

    #[error("unsupported cloud provider {0}")]
    UnsupportedCloud(CloudProvider),

    #[error("error while creating {kind} {name}: {source}")]
    NodeClassBootstrap {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error(
        "when node auto-provisioning is disabled, at least {target} ready BYO nodes are required, found {available}"
    )]
    InsufficientByoNodes { target: u32, available: usize },

    #[error("failed to create node claim after {attempts} attempts: name already taken")]
    NameCollision { attempts: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

/// How a caller should treat an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input; fix the request
    Validation,
    /// Infrastructure hiccup; retry later
    Transient,
    /// Do not requeue until the request changes
    Terminal,
    Timeout,
    Cancelled,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Capacity(_)
            | Self::UnsupportedCloud(_)
            | Self::InsufficientByoNodes { .. }
            | Self::Config(_) => ErrorClass::Validation,
            Self::Kube(err) if is_invalid_request(err) => ErrorClass::Validation,
            Self::Kube(_) | Self::NodeClassBootstrap { .. } | Self::NameCollision { .. } => {
                ErrorClass::Transient
            }
            Self::InstanceTypeUnavailable { .. } => ErrorClass::Terminal,
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::Cancelled { .. } => ErrorClass::Cancelled,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient | ErrorClass::Timeout)
    }

    /// Stable reason code for workload status conditions
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Capacity(err) => err.reason(),
            Self::Kube(_) => "KubernetesAPIError",
            Self::InstanceTypeUnavailable { .. } => "InstanceTypeUnavailable",
            Self::Timeout { .. } => "NodeClaimTimeout",
            Self::Cancelled { .. } => "Cancelled",
            Self::UnsupportedCloud(_) => "UnsupportedCloudProvider",
            Self::NodeClassBootstrap { .. } => "NodeClassCreationFailed",
            Self::InsufficientByoNodes { .. } => "InsufficientBYONodes",
            Self::NameCollision { .. } => "NodeClaimNameCollision",
            Self::Config(_) => "InvalidConfiguration",
        }
    }
}

fn is_invalid_request(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 400 || resp.code == 422)
}

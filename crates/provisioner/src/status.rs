//! Workload status conditions for node provisioning

use crate::error::{Error, ErrorClass};
use crate::orchestrator::ClaimReadiness;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

pub const CONDITION_NODE_CLAIM_READY: &str = "NodeClaimReady";

pub const REASON_READY: &str = "NodeClaimsReady";
pub const REASON_PROVISIONING: &str = "NodeClaimsProvisioning";
pub const REASON_COUNT_MISMATCH: &str = "NodeClaimCountMismatch";
pub const REASON_NOT_READY: &str = "NodeClaimNotReady";

/// The `NodeClaimReady` condition a reconciler should publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProvisioningCondition {
    pub ready: bool,
    pub reason: String,
    pub message: String,
}

impl NodeProvisioningCondition {
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            ready: true,
            reason: REASON_READY.to_string(),
            message: message.into(),
        }
    }

    pub fn pending(reason: &str, message: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    /// Condition for an operation outcome. Cancellation leaves the status
    /// untouched; timeouts report "still provisioning" rather than an error.
    pub fn from_outcome<T>(outcome: &Result<T, Error>) -> Option<Self> {
        match outcome {
            Ok(_) => Some(Self::ready("All node claims are ready")),
            Err(err) => match err.class() {
                ErrorClass::Cancelled => None,
                ErrorClass::Timeout => Some(Self::pending(REASON_PROVISIONING, err.to_string())),
                _ => Some(Self::pending(err.reason(), err.to_string())),
            },
        }
    }

    pub fn from_readiness(readiness: &ClaimReadiness, byo_nodes: usize) -> Self {
        match readiness {
            ClaimReadiness::Ready { claims } => Self::ready(format!(
                "All node claims are ready (node claims: {claims}, BYO nodes: {byo_nodes})"
            )),
            ClaimReadiness::CountMismatch { current, required } => Self::pending(
                REASON_COUNT_MISMATCH,
                format!("node claim count ({current}) does not match required ({required}, BYO: {byo_nodes})"),
            ),
            ClaimReadiness::NotReady { node_claim } => Self::pending(
                REASON_NOT_READY,
                format!("node claim {node_claim} is not ready yet"),
            ),
        }
    }

    /// Render as a Kubernetes condition.
    pub fn to_condition(&self, observed_generation: Option<i64>) -> Condition {
        Condition {
            type_: CONDITION_NODE_CLAIM_READY.to_string(),
            status: if self.ready { "True" } else { "False" }.to_string(),
            reason: self.reason.clone(),
            message: self.message.clone(),
            observed_generation,
            last_transition_time: Time(Utc::now()),
        }
    }
}

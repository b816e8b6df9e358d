//! What a workload asks of the provisioner

use crate::cluster::LabelSet;
use crate::crds::{LABEL_WORKLOAD_NAME, LABEL_WORKLOAD_NAMESPACE};
use crate::error::Result;
use gpu::{plan_context_length, CapacityEstimator, ModelResourceProfile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the workload that owns a set of claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Labels stamped on every claim this workload owns
    pub fn owner_labels(&self) -> LabelSet {
        LabelSet::from([
            (LABEL_WORKLOAD_NAME.to_string(), self.name.clone()),
            (LABEL_WORKLOAD_NAMESPACE.to_string(), self.namespace.clone()),
        ])
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Snapshot of a workload's node requirements
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRequest {
    pub owner: WorkloadRef,

    pub instance_type: String,

    /// Node count asked for by the user, before sizing
    #[serde(default)]
    pub requested_node_count: Option<u32>,

    /// Nodes cooperating on one model replica
    #[serde(default = "default_nodes_per_replica")]
    pub nodes_per_replica: u32,

    /// Labels BYO nodes must carry; also copied onto claims
    #[serde(default)]
    pub label_selector: LabelSet,

    /// Restricts BYO nodes to these names, in this order
    #[serde(default)]
    pub preferred_node_names: Vec<String>,

    /// Whether the workload carries a sizing profile
    #[serde(default)]
    pub has_profile: bool,

    /// Model preset the workload was sized from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ModelResourceProfile>,

    /// Target node count previously computed and carried in workload status
    #[serde(default)]
    pub target_node_count: Option<u32>,

    /// Per-node storage request, e.g. `2048Gi`
    #[serde(default)]
    pub storage_requirement: Option<String>,
}

fn default_nodes_per_replica() -> u32 {
    1
}

/// Node count and context length derived from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingPlan {
    pub node_count: u32,
    /// Suggested max context length; 0 leaves the runtime default
    pub max_model_len: u32,
}

impl ProvisioningRequest {
    pub fn new(owner: WorkloadRef, instance_type: impl Into<String>) -> Self {
        Self {
            owner,
            instance_type: instance_type.into(),
            nodes_per_replica: default_nodes_per_replica(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_label_selector(mut self, selector: LabelSet) -> Self {
        self.label_selector = selector;
        self
    }

    #[must_use]
    pub fn with_preferred_nodes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_node_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the workload as profiled and record its status target.
    #[must_use]
    pub fn with_target_node_count(mut self, target: u32) -> Self {
        self.has_profile = true;
        self.target_node_count = Some(target);
        self
    }

    #[must_use]
    pub fn with_requested_node_count(mut self, count: u32) -> Self {
        self.requested_node_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_nodes_per_replica(mut self, nodes: u32) -> Self {
        self.nodes_per_replica = nodes;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: ModelResourceProfile) -> Self {
        self.has_profile = true;
        self.profile = Some(profile);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage_requirement = Some(storage.into());
        self
    }

    /// Per-node storage: the request's own value, then the profile's disk
    /// requirement, then `default`.
    pub fn storage_or(&self, default: &str) -> String {
        self.storage_requirement
            .clone()
            .or_else(|| {
                self.profile
                    .as_ref()
                    .and_then(|p| p.disk_storage_requirement.clone())
            })
            .unwrap_or_else(|| default.to_string())
    }

    /// Size the request against `estimator`'s catalog.
    ///
    /// The node count is the requested count, consolidated when the profile
    /// fits on fewer nodes. The context length is planned for one replica
    /// spanning `nodes_per_replica` nodes.
    pub fn plan(&self, estimator: &CapacityEstimator) -> Result<SizingPlan> {
        let node_count = estimator.estimate(
            self.profile.as_ref(),
            self.requested_node_count,
            &self.instance_type,
        )?;
        let max_model_len = self.profile.as_ref().map_or(0, |profile| {
            estimator
                .catalog()
                .get(&self.instance_type)
                .map_or(0, |capacity| {
                    plan_context_length(profile, capacity, self.nodes_per_replica)
                })
        });
        Ok(SizingPlan {
            node_count,
            max_model_len,
        })
    }

    /// Nodes the workload must end up with: 1 without a profile, otherwise
    /// the status target.
    pub fn target_nodes(&self) -> u32 {
        if self.has_profile {
            self.target_node_count.unwrap_or(1)
        } else {
            1
        }
    }
}

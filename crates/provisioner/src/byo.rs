//! Bring-your-own node accounting
//!
//! Counts pre-existing nodes a workload may reuse, so that only the
//! remainder is provisioned through node claims.

use crate::cluster::ClusterApi;
use crate::config::FeatureGates;
use crate::error::{Error, Result};
use crate::request::ProvisioningRequest;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ByoResolver {
    cluster: Arc<dyn ClusterApi>,
    feature_gates: FeatureGates,
}

/// Ready and not being deleted
pub fn is_node_available(node: &Node) -> bool {
    node.metadata.deletion_timestamp.is_none()
        && node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
}

impl fmt::Debug for ByoResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByoResolver")
            .field("feature_gates", &self.feature_gates)
            .finish_non_exhaustive()
    }
}

impl ByoResolver {
    pub fn new(cluster: Arc<dyn ClusterApi>, feature_gates: FeatureGates) -> Self {
        Self {
            cluster,
            feature_gates,
        }
    }

    /// Nodes the workload can use right now.
    ///
    /// With preferred names set only those nodes count, in the order given.
    /// When auto-provisioning is disabled the preferred list is ignored.
    pub async fn available_nodes(&self, request: &ProvisioningRequest) -> Result<Vec<Node>> {
        let nodes = self.cluster.list_nodes(&request.label_selector).await?;
        let use_preferred = !self.feature_gates.disable_node_auto_provisioning
            && !request.preferred_node_names.is_empty();

        let candidates: Vec<Node> = if use_preferred {
            // a node counts once however often it is listed
            let mut seen = HashSet::new();
            request
                .preferred_node_names
                .iter()
                .filter(|&wanted| seen.insert(wanted.as_str()))
                .filter_map(|wanted| nodes.iter().find(|n| n.name_any() == *wanted))
                .cloned()
                .collect()
        } else {
            nodes
        };

        let available: Vec<Node> = candidates
            .into_iter()
            .filter(|node| {
                let ok = is_node_available(node);
                if !ok {
                    debug!(node = %node.name_any(), "BYO node is not ready, skipping");
                }
                ok
            })
            .collect();

        debug!(
            workload = %request.owner,
            preferred = request.preferred_node_names.len(),
            available = available.len(),
            "found available BYO nodes"
        );
        Ok(available)
    }

    /// Nodes still to provision once reusable nodes are accounted for.
    pub async fn required_additional_nodes(&self, request: &ProvisioningRequest) -> Result<u32> {
        if self.feature_gates.disable_node_auto_provisioning {
            return Ok(0);
        }
        let target = request.target_nodes();
        let available = self.available_nodes(request).await?.len();
        let required = target.saturating_sub(u32::try_from(available).unwrap_or(u32::MAX));
        info!(
            workload = %request.owner,
            target,
            available,
            required,
            "computed required node claims"
        );
        Ok(required)
    }

    /// With auto-provisioning disabled, the BYO nodes must cover the target
    /// on their own. Returns the available count.
    pub async fn verify_byo_capacity(&self, request: &ProvisioningRequest) -> Result<usize> {
        let available = self.available_nodes(request).await?.len();
        let target = request.target_nodes();
        if self.feature_gates.disable_node_auto_provisioning
            && available < usize::try_from(target).unwrap_or(usize::MAX)
        {
            return Err(Error::InsufficientByoNodes { target, available });
        }
        Ok(available)
    }
}

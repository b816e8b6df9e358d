//! Cluster API seam
//!
//! Everything the orchestrator and BYO resolver need from the API server.
//! [`KubeCluster`] talks to a real cluster; [`InMemoryCluster`] backs tests.

mod client;
mod memory;

pub use client::KubeCluster;
pub use memory::{InMemoryCluster, Operation};

use crate::crds::{NodeClaim, NodeClassKind, NodeClassManifest};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;

/// Equality-based label selector
pub type LabelSet = BTreeMap<String, String>;

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_node_claim(&self, name: &str) -> kube::Result<NodeClaim>;

    async fn create_node_claim(&self, claim: &NodeClaim) -> kube::Result<NodeClaim>;

    async fn delete_node_claim(&self, name: &str) -> kube::Result<()>;

    async fn list_node_claims(&self, selector: &LabelSet) -> kube::Result<Vec<NodeClaim>>;

    async fn node_class_exists(&self, kind: NodeClassKind, name: &str) -> kube::Result<bool>;

    async fn create_node_class(&self, class: &NodeClassManifest) -> kube::Result<()>;

    async fn list_nodes(&self, selector: &LabelSet) -> kube::Result<Vec<Node>>;
}

/// Render a label selector as `k1=v1,k2=v2`
pub fn selector_string(selector: &LabelSet) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn matches_labels(labels: Option<&BTreeMap<String, String>>, selector: &LabelSet) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
}

pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

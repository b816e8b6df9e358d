//! Bring-your-own node accounting against the in-memory cluster.

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use provisioner::cluster::{LabelSet, Operation};
use provisioner::{
    ByoResolver, Error, ErrorClass, FeatureGates, InMemoryCluster, ProvisioningRequest,
    WorkloadRef,
};
use std::sync::Arc;

fn gpu_pool() -> LabelSet {
    LabelSet::from([("apps".to_string(), "llama".to_string())])
}

fn cluster() -> Arc<InMemoryCluster> {
    let cluster = Arc::new(InMemoryCluster::new());
    cluster.insert_node(InMemoryCluster::node("gpu-a", &gpu_pool(), true));
    cluster.insert_node(InMemoryCluster::node("gpu-b", &gpu_pool(), true));
    cluster.insert_node(InMemoryCluster::node("gpu-c", &gpu_pool(), false));
    cluster.insert_node(InMemoryCluster::node("cpu-a", &LabelSet::new(), true));
    cluster
}

fn deleting(name: &str) -> Node {
    let mut node = InMemoryCluster::node(name, &gpu_pool(), true);
    node.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    node
}

fn request(target: u32) -> ProvisioningRequest {
    ProvisioningRequest::new(WorkloadRef::new("default", "llama-70b"), "Standard_NC96ads_A100_v4")
        .with_label_selector(gpu_pool())
        .with_preferred_nodes(["gpu-a", "gpu-b"])
        .with_target_node_count(target)
}

fn nap_disabled() -> FeatureGates {
    FeatureGates {
        disable_node_auto_provisioning: true,
        ..FeatureGates::default()
    }
}

#[tokio::test]
async fn two_preferred_nodes_cover_part_of_five() {
    let resolver = ByoResolver::new(cluster(), FeatureGates::default());
    assert_eq!(resolver.required_additional_nodes(&request(5)).await.unwrap(), 3);
}

#[tokio::test]
async fn two_preferred_nodes_cover_a_target_of_two() {
    let resolver = ByoResolver::new(cluster(), FeatureGates::default());
    assert_eq!(resolver.required_additional_nodes(&request(2)).await.unwrap(), 0);
}

#[tokio::test]
async fn surplus_nodes_never_go_negative() {
    let resolver = ByoResolver::new(cluster(), FeatureGates::default());
    assert_eq!(resolver.required_additional_nodes(&request(1)).await.unwrap(), 0);
}

#[tokio::test]
async fn disabled_auto_provisioning_needs_nothing() {
    let cluster = cluster();
    let resolver = ByoResolver::new(cluster.clone(), nap_disabled());
    assert_eq!(resolver.required_additional_nodes(&request(8)).await.unwrap(), 0);
    assert_eq!(cluster.calls(Operation::ListNodes), 0);
}

#[tokio::test]
async fn selector_applies_without_preferred_names() {
    let resolver = ByoResolver::new(cluster(), FeatureGates::default());
    let request = ProvisioningRequest {
        preferred_node_names: Vec::new(),
        ..request(3)
    };
    // gpu-a and gpu-b; gpu-c is not ready and cpu-a does not match
    assert_eq!(resolver.available_nodes(&request).await.unwrap().len(), 2);
    assert_eq!(resolver.required_additional_nodes(&request).await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_nodes_are_not_available() {
    let cluster = cluster();
    cluster.insert_node(deleting("gpu-d"));
    let resolver = ByoResolver::new(cluster, nap_disabled());
    assert_eq!(resolver.available_nodes(&request(1)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn byo_capacity_is_verified_when_provisioning_is_off() {
    let resolver = ByoResolver::new(cluster(), nap_disabled());
    assert_eq!(resolver.verify_byo_capacity(&request(2)).await.unwrap(), 2);

    let err = resolver.verify_byo_capacity(&request(3)).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
    assert!(matches!(
        err,
        Error::InsufficientByoNodes {
            target: 3,
            available: 2
        }
    ));
}

#[tokio::test]
async fn node_list_errors_surface() {
    let cluster = cluster();
    cluster.fail_next(Operation::ListNodes, 500);
    let resolver = ByoResolver::new(cluster, FeatureGates::default());
    let err = resolver
        .required_additional_nodes(&request(2))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

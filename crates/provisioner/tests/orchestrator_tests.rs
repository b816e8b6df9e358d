//! Node-claim lifecycle against the in-memory cluster.
//!
//! Poll loops run on paused tokio time, so the 240s deadline costs nothing.

use gpu::{CloudProvider, ModelResourceProfile};
use kube::ResourceExt;
use provisioner::cluster::Operation;
use provisioner::crds::{
    Condition, NodeClassKind, CONDITION_INITIALIZED, CONDITION_LAUNCHED, CONDITION_READY,
    ERROR_INSTANCE_TYPES_UNAVAILABLE,
};
use provisioner::naming::node_claim_name;
use provisioner::{
    ClaimReadiness, Error, ErrorClass, FeatureGates, InMemoryCluster, NodeClaimOrchestrator,
    ProvisionerConfig, ProvisioningRequest, SequenceIdSource, WorkloadRef,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INSTANCE_TYPE: &str = "Standard_NC12s_v3";

fn setup(config: ProvisionerConfig) -> (Arc<InMemoryCluster>, NodeClaimOrchestrator) {
    let cluster = Arc::new(InMemoryCluster::new());
    let orchestrator = NodeClaimOrchestrator::new(cluster.clone(), config)
        .unwrap()
        .with_id_source(Arc::new(SequenceIdSource::default()));
    (cluster, orchestrator)
}

fn azure() -> (Arc<InMemoryCluster>, NodeClaimOrchestrator) {
    setup(ProvisionerConfig::new(CloudProvider::Azure))
}

fn request() -> ProvisioningRequest {
    ProvisioningRequest::new(WorkloadRef::new("default", "falcon-7b"), INSTANCE_TYPE)
}

fn launched() -> Vec<Condition> {
    vec![Condition::new(CONDITION_LAUNCHED, true)]
}

fn initialized() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_LAUNCHED, true),
        Condition::new(CONDITION_INITIALIZED, true),
    ]
}

fn ready() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_LAUNCHED, true),
        Condition::new(CONDITION_INITIALIZED, true),
        Condition::new(CONDITION_READY, true),
    ]
}

#[tokio::test(start_paused = true)]
async fn claim_becomes_ready_after_a_few_polls() {
    let (cluster, orchestrator) = azure();
    cluster.set_launch_script(vec![vec![], launched(), initialized(), ready()]);

    let claim = orchestrator.create_claim_for(&request()).await.unwrap();
    let started = Instant::now();
    let ready = orchestrator
        .wait_for_ready(&claim.name_any(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(ready.is_ready());
    assert_eq!(cluster.calls(Operation::GetNodeClaim), 4);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn unavailable_instance_type_short_circuits() {
    let (cluster, orchestrator) = azure();
    cluster.set_launch_script(vec![
        launched(),
        vec![Condition::new(CONDITION_LAUNCHED, false)
            .with_reason("LaunchFailed")
            .with_message(format!("creating instance, {ERROR_INSTANCE_TYPES_UNAVAILABLE}"))],
    ]);

    let claim = orchestrator.create_claim_for(&request()).await.unwrap();
    let started = Instant::now();
    let err = orchestrator
        .wait_for_ready(&claim.name_any(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, Error::InstanceTypeUnavailable { instance_type, .. } if instance_type == INSTANCE_TYPE)
    );
    assert_eq!(err.class(), ErrorClass::Terminal);
    assert!(!err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(240));
}

#[tokio::test(start_paused = true)]
async fn wait_times_out_at_the_deadline() {
    let (_cluster, orchestrator) = azure();
    let claim = orchestrator.create_claim_for(&request()).await.unwrap();

    let started = Instant::now();
    let err = orchestrator
        .wait_for_ready(&claim.name_any(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_retryable());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(240) && elapsed < Duration::from_secs(241));
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_not_a_timeout() {
    let (_cluster, orchestrator) = azure();
    let claim = orchestrator.create_claim_for(&request()).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = orchestrator
        .wait_for_ready(&claim.name_any(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(err.class(), ErrorClass::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(240));
}

#[tokio::test]
async fn get_errors_propagate_from_wait() {
    let (cluster, orchestrator) = azure();
    cluster.fail_next(Operation::GetNodeClaim, 500);
    let err = orchestrator
        .wait_for_ready("ws000000000", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
}

#[tokio::test]
async fn node_class_is_bootstrapped_once() {
    let config = ProvisionerConfig::new(CloudProvider::Azure).with_feature_gates(FeatureGates {
        ensure_node_class: true,
        ..FeatureGates::default()
    });
    let (cluster, orchestrator) = setup(config);

    orchestrator.create_claim_for(&request()).await.unwrap();
    orchestrator.create_claim_for(&request()).await.unwrap();

    assert!(cluster.has_node_class(NodeClassKind::Aks, "default"));
    assert_eq!(cluster.calls(Operation::CreateNodeClass), 1);
    assert_eq!(cluster.node_claims().len(), 2);
}

#[tokio::test]
async fn node_class_race_is_tolerated() {
    let config = ProvisionerConfig::new(CloudProvider::Azure).with_feature_gates(FeatureGates {
        ensure_node_class: true,
        ..FeatureGates::default()
    });
    let (cluster, orchestrator) = setup(config);
    cluster.fail_next(Operation::CreateNodeClass, 409);

    orchestrator.ensure_node_class().await.unwrap();
}

#[tokio::test]
async fn node_class_failures_surface() {
    let config = ProvisionerConfig::new(CloudProvider::Aws)
        .with_cluster_name("prod-east")
        .with_feature_gates(FeatureGates {
            ensure_node_class: true,
            ..FeatureGates::default()
        });
    let (cluster, orchestrator) = setup(config);
    cluster.fail_next(Operation::CreateNodeClass, 403);

    let err = orchestrator.create_claim_for(&request()).await.unwrap_err();
    assert!(matches!(err, Error::NodeClassBootstrap { .. }));
    assert!(cluster.node_claims().is_empty());
}

#[tokio::test]
async fn arc_cannot_bootstrap_a_node_class() {
    let (_cluster, orchestrator) = setup(ProvisionerConfig::new(CloudProvider::Arc));
    let err = orchestrator.ensure_node_class().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedCloud(CloudProvider::Arc)));

    let claim = orchestrator.generate_claim(&request());
    assert!(claim.spec.node_class_ref.is_none());
}

fn bootstrapping(config: ProvisionerConfig) -> ProvisionerConfig {
    config.with_feature_gates(FeatureGates {
        ensure_node_class: true,
        ..FeatureGates::default()
    })
}

#[tokio::test]
async fn create_claim_checks_node_class_before_submitting() {
    let (cluster, orchestrator) = setup(bootstrapping(ProvisionerConfig::new(CloudProvider::Azure)));
    let claim = orchestrator.generate_claim(&request());

    let created = orchestrator.create_claim(&claim).await.unwrap();
    assert_eq!(created.name_any(), claim.name_any());
    assert!(cluster.has_node_class(NodeClassKind::Aks, "default"));
    assert_eq!(cluster.calls(Operation::GetNodeClass), 1);
    assert!(cluster.node_claim(&claim.name_any()).is_some());
}

#[tokio::test]
async fn create_claim_is_not_submitted_without_a_node_class() {
    let (cluster, orchestrator) = setup(bootstrapping(ProvisionerConfig::new(CloudProvider::Azure)));
    cluster.fail_next(Operation::CreateNodeClass, 403);
    let claim = orchestrator.generate_claim(&request());

    let err = orchestrator.create_claim(&claim).await.unwrap_err();
    assert!(matches!(err, Error::NodeClassBootstrap { .. }));
    assert_eq!(cluster.calls(Operation::CreateNodeClaim), 0);
    assert!(cluster.node_claims().is_empty());
}

#[tokio::test]
async fn create_claim_skips_node_class_when_gate_is_off() {
    let (cluster, orchestrator) = azure();
    let claim = orchestrator.generate_claim(&request());

    orchestrator.create_claim(&claim).await.unwrap();
    assert_eq!(cluster.calls(Operation::GetNodeClass), 0);
    assert_eq!(cluster.calls(Operation::CreateNodeClass), 0);
}

#[tokio::test]
async fn create_claim_conflict_is_transient() {
    let (cluster, orchestrator) = azure();
    let claim = orchestrator.generate_claim(&request());
    cluster.insert_node_claim(claim.clone());

    let err = orchestrator.create_claim(&claim).await.unwrap_err();
    assert!(matches!(err, Error::Kube(_)));
    assert_eq!(err.class(), ErrorClass::Transient);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn claim_storage_falls_back_to_profile_then_config() {
    let (_cluster, orchestrator) = azure();
    let profile = ModelResourceProfile {
        model_name: "falcon-7b".to_string(),
        hard_token_limit: 2048,
        bytes_per_token: 92_160,
        total_weight_size: "13.44Gi".to_string(),
        total_gpu_memory_requirement: "14Gi".to_string(),
        gpu_count_requirement: 1,
        disk_storage_requirement: Some("512Gi".to_string()),
    };

    let from_config = orchestrator.generate_claim(&request());
    assert_eq!(from_config.spec.resources.requests["storage"], "1024Gi");

    let from_profile = orchestrator.generate_claim(&request().with_profile(profile.clone()));
    assert_eq!(from_profile.spec.resources.requests["storage"], "512Gi");

    let explicit = orchestrator.generate_claim(&request().with_profile(profile).with_storage("2Ti"));
    assert_eq!(explicit.spec.resources.requests["storage"], "2Ti");
}

#[tokio::test]
async fn deleting_a_missing_claim_succeeds() {
    let (cluster, orchestrator) = azure();
    orchestrator.delete_claim("ws000000000").await.unwrap();

    cluster.fail_next(Operation::DeleteNodeClaim, 500);
    let err = orchestrator.delete_claim("ws000000000").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn name_collision_retries_with_fresh_id() {
    let (cluster, orchestrator) = azure();
    let (_, twin) = azure();
    let taken = twin.generate_claim(&request());
    cluster.insert_node_claim(taken.clone());

    let claim = orchestrator.create_claim_for(&request()).await.unwrap();
    assert_ne!(claim.name_any(), taken.name_any());
    assert_eq!(claim.name_any(), node_claim_name("default", "falcon-7b", "1"));
    assert_eq!(cluster.calls(Operation::CreateNodeClaim), 2);
}

#[tokio::test(start_paused = true)]
async fn name_collision_gives_up_after_five_attempts() {
    let (cluster, orchestrator) = azure();
    for _ in 0..5 {
        cluster.fail_next(Operation::CreateNodeClaim, 409);
    }
    let err = orchestrator.create_claim_for(&request()).await.unwrap_err();
    assert!(matches!(err, Error::NameCollision { attempts: 5 }));
}

#[tokio::test(start_paused = true)]
async fn list_retries_transient_failures() {
    let (cluster, orchestrator) = azure();
    orchestrator.create_claim_for(&request()).await.unwrap();
    cluster.fail_next(Operation::ListNodeClaims, 500);
    cluster.fail_next(Operation::ListNodeClaims, 503);

    let claims = orchestrator.list_claims(&request().owner).await.unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(cluster.calls(Operation::ListNodeClaims), 3);
}

#[tokio::test(start_paused = true)]
async fn list_gives_up_after_backoff_steps() {
    let (cluster, orchestrator) = azure();
    for _ in 0..4 {
        cluster.fail_next(Operation::ListNodeClaims, 500);
    }
    let err = orchestrator.list_claims(&request().owner).await.unwrap_err();
    assert!(matches!(err, Error::Kube(_)));
    assert_eq!(cluster.calls(Operation::ListNodeClaims), 4);
}

#[tokio::test]
async fn list_only_returns_owned_claims() {
    let (_cluster, orchestrator) = azure();
    orchestrator.create_claim_for(&request()).await.unwrap();
    let other = ProvisioningRequest::new(WorkloadRef::new("default", "phi-3"), INSTANCE_TYPE);
    orchestrator.create_claim_for(&other).await.unwrap();

    assert_eq!(orchestrator.list_claims(&request().owner).await.unwrap().len(), 1);
    assert_eq!(orchestrator.list_claims(&other.owner).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_for_pending_skips_initialized_and_other_instance_types() {
    let (cluster, orchestrator) = azure();

    let done = orchestrator.create_claim_for(&request()).await.unwrap();
    cluster.set_conditions(&done.name_any(), initialized());

    let pending = orchestrator.create_claim_for(&request()).await.unwrap();
    cluster.script_conditions(&pending.name_any(), vec![launched(), ready()]);

    let other = request();
    let other = ProvisioningRequest {
        instance_type: "Standard_NC24s_v3".to_string(),
        ..other
    };
    orchestrator.create_claim_for(&other).await.unwrap();

    orchestrator
        .wait_for_pending(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cluster.calls(Operation::GetNodeClaim), 2);
}

#[tokio::test(start_paused = true)]
async fn sync_scales_up_and_down() {
    let (cluster, orchestrator) = azure();

    let sync = orchestrator.sync_claims(&request(), 2).await.unwrap();
    assert_eq!(sync.created.len(), 2);
    assert_eq!(sync.existing, 0);

    let keep = &sync.created[0];
    let drop = &sync.created[1];
    cluster.set_conditions(keep, ready());

    assert_eq!(
        orchestrator.claims_ready(&request(), 2).await.unwrap(),
        ClaimReadiness::NotReady {
            node_claim: drop.clone()
        }
    );

    let sync = orchestrator.sync_claims(&request(), 1).await.unwrap();
    assert_eq!(&sync.deleted, &vec![drop.clone()]);
    assert!(cluster.node_claim(drop).is_none());
    assert!(cluster.node_claim(keep).is_some());

    assert_eq!(
        orchestrator.claims_ready(&request(), 1).await.unwrap(),
        ClaimReadiness::Ready { claims: 1 }
    );
    assert_eq!(
        orchestrator.claims_ready(&request(), 3).await.unwrap(),
        ClaimReadiness::CountMismatch {
            current: 1,
            required: 3
        }
    );

    let sync = orchestrator.sync_claims(&request(), 1).await.unwrap();
    assert!(sync.created.is_empty() && sync.deleted.is_empty());
}

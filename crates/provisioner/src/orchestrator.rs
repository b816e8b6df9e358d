//! Node-claim lifecycle: generate, create, wait, list, scale.

use crate::cloud::CloudProvisioner;
use crate::cluster::{is_already_exists, is_not_found, ClusterApi};
use crate::config::ProvisionerConfig;
use crate::crds::{
    NodeClaim, NodeClaimSpec, NodeSelectorRequirement, ResourceRequirements, Taint,
    ANNOTATION_DO_NOT_DISRUPT, LABEL_INSTANCE_TYPE, LABEL_NODE_POOL, LABEL_OS, TAINT_KEY_SKU,
    TAINT_VALUE_GPU,
};
use crate::error::{Error, Result};
use crate::naming::{node_claim_name, IdSource, UuidIdSource};
use crate::request::{ProvisioningRequest, WorkloadRef};
use crate::retry::{retry_on_error, Backoff};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::cmp::Ordering;
use std::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Attempts at finding a free claim name before giving up
pub const MAX_NAME_ATTEMPTS: u32 = 5;
const NAME_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Result of reconciling the claim count for a workload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSync {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    /// Claims owned by the workload before the sync
    pub existing: usize,
}

/// Whether a workload's claims are all up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimReadiness {
    Ready { claims: usize },
    CountMismatch { current: usize, required: u32 },
    NotReady { node_claim: String },
}

pub struct NodeClaimOrchestrator {
    cluster: Arc<dyn ClusterApi>,
    cloud: CloudProvisioner,
    config: ProvisionerConfig,
    ids: Arc<dyn IdSource>,
    list_backoff: Backoff,
}

impl fmt::Debug for NodeClaimOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClaimOrchestrator")
            .field("cloud", &self.cloud)
            .field("config", &self.config)
            .field("list_backoff", &self.list_backoff)
            .finish_non_exhaustive()
    }
}

impl NodeClaimOrchestrator {
    pub fn new(cluster: Arc<dyn ClusterApi>, config: ProvisionerConfig) -> Result<Self> {
        config.validate()?;
        let cloud = CloudProvisioner::from_config(&config)?;
        Ok(Self {
            cluster,
            cloud,
            config,
            ids: Arc::new(UuidIdSource),
            list_backoff: Backoff::default(),
        })
    }

    #[must_use]
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    #[must_use]
    pub fn with_list_backoff(mut self, backoff: Backoff) -> Self {
        self.list_backoff = backoff;
        self
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn cloud(&self) -> &CloudProvisioner {
        &self.cloud
    }

    /// Build a claim for one node of the requested instance type.
    pub fn generate_claim(&self, request: &ProvisioningRequest) -> NodeClaim {
        let owner = &request.owner;
        let name = node_claim_name(&owner.namespace, &owner.name, &self.ids.next_id());
        let pool = &self.config.node_pool_name;

        let mut labels = BTreeMap::from([(LABEL_NODE_POOL.to_string(), pool.clone())]);
        labels.extend(owner.owner_labels());
        labels.extend(request.label_selector.clone());

        let mut requirements = vec![
            NodeSelectorRequirement::is_in(LABEL_NODE_POOL, [pool.as_str()]),
            NodeSelectorRequirement::is_in(LABEL_INSTANCE_TYPE, [request.instance_type.as_str()]),
            NodeSelectorRequirement::is_in(LABEL_OS, ["linux"]),
        ];
        requirements.extend(self.cloud.build_claim_selector(&request.instance_type));

        let storage = request.storage_or(&self.config.default_storage);

        let mut claim = NodeClaim::new(
            &name,
            NodeClaimSpec {
                node_class_ref: self.cloud.node_class_ref(&self.config.node_class_name),
                taints: vec![Taint {
                    key: TAINT_KEY_SKU.to_string(),
                    value: Some(TAINT_VALUE_GPU.to_string()),
                    effect: "NoSchedule".to_string(),
                }],
                requirements,
                resources: ResourceRequirements {
                    requests: BTreeMap::from([("storage".to_string(), storage)]),
                },
            },
        );
        claim.metadata = ObjectMeta {
            name: Some(name),
            labels: Some(labels),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_DO_NOT_DISRUPT.to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        };
        claim
    }

    /// Create the node class singleton if it is missing.
    #[instrument(skip(self), fields(cloud = %self.cloud.cloud()))]
    pub async fn ensure_node_class(&self) -> Result<()> {
        let Some(kind) = self.cloud.node_class_kind() else {
            return Err(Error::UnsupportedCloud(self.cloud.cloud()));
        };
        let name = &self.config.node_class_name;
        if self.cluster.node_class_exists(kind, name).await? {
            debug!(kind = %kind, name = %name, "node class present");
            return Ok(());
        }

        let manifest = self.cloud.build_node_class(name)?;
        match self.cluster.create_node_class(&manifest).await {
            Ok(()) => {
                info!(kind = %kind, name = %name, "created node class");
                Ok(())
            }
            Err(err) if is_already_exists(&err) => {
                debug!(kind = %kind, name = %name, "node class created concurrently");
                Ok(())
            }
            Err(source) => Err(Error::NodeClassBootstrap {
                kind: kind.to_string(),
                name: name.clone(),
                source,
            }),
        }
    }

    /// Submit a claim, bootstrapping the node class first when enabled.
    pub async fn create_claim(&self, claim: &NodeClaim) -> Result<NodeClaim> {
        if self.config.feature_gates.ensure_node_class {
            self.ensure_node_class().await?;
        }
        self.submit(claim).await
    }

    async fn submit(&self, claim: &NodeClaim) -> Result<NodeClaim> {
        info!(node_claim = %claim.name_any(), "creating node claim");
        Ok(self.cluster.create_node_claim(claim).await?)
    }

    /// Generate and create a claim, retrying with a fresh name on collision.
    #[instrument(skip(self, request), fields(workload = %request.owner, instance_type = %request.instance_type))]
    pub async fn create_claim_for(&self, request: &ProvisioningRequest) -> Result<NodeClaim> {
        if self.config.feature_gates.ensure_node_class {
            self.ensure_node_class().await?;
        }
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let claim = self.generate_claim(request);
            match self.submit(&claim).await {
                Err(Error::Kube(err)) if is_already_exists(&err) => {
                    debug!(
                        node_claim = %claim.name_any(),
                        attempt,
                        "node claim name taken, generating a new one"
                    );
                    sleep(NAME_RETRY_DELAY).await;
                }
                result => return result,
            }
        }
        Err(Error::NameCollision {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// Poll a claim until it is Ready, fails terminally, times out, or the
    /// token is cancelled.
    #[instrument(skip_all, fields(node_claim = %name))]
    pub async fn wait_for_ready(&self, name: &str, cancel: &CancellationToken) -> Result<NodeClaim> {
        let wait = self.config.wait;
        let started = Instant::now();
        let deadline = started + wait.deadline;
        info!(deadline_secs = wait.deadline.as_secs(), "waiting for node claim");

        loop {
            let claim = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(name)),
                () = sleep_until(deadline) => return Err(timed_out(name, wait.deadline)),
                fetched = self.cluster.get_node_claim(name) => fetched?,
            };

            if claim.is_ready() {
                info!(
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "node claim is ready"
                );
                return Ok(claim);
            }

            if let Some(message) = claim.launch_unavailable_message() {
                let instance_type = claim.instance_types().next().unwrap_or_default().to_string();
                error!(
                    instance_type = %instance_type,
                    message = %message,
                    "instance type unavailable, reconcile will not continue"
                );
                return Err(Error::InstanceTypeUnavailable {
                    node_claim: name.to_string(),
                    instance_type,
                    message: message.to_string(),
                });
            }

            debug!(phase = %claim.phase(), "node claim not ready yet");

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(cancelled(name)),
                () = sleep_until(deadline) => return Err(timed_out(name, wait.deadline)),
                () = sleep(wait.poll_interval) => {}
            }
        }
    }

    /// All claims owned by a workload. Retried with backoff on any error.
    pub async fn list_claims(&self, owner: &WorkloadRef) -> Result<Vec<NodeClaim>> {
        let selector = owner.owner_labels();
        let cluster = &self.cluster;
        let selector = &selector;
        let claims = retry_on_error(
            self.list_backoff,
            |_| true,
            move || cluster.list_node_claims(selector),
        )
        .await?;
        debug!(workload = %owner, count = claims.len(), "listed node claims");
        Ok(claims)
    }

    /// Claims for the request's instance type that are not being deleted
    pub async fn existing_claims(&self, request: &ProvisioningRequest) -> Result<Vec<NodeClaim>> {
        Ok(self
            .list_claims(&request.owner)
            .await?
            .into_iter()
            .filter(|c| c.requests_instance_type(&request.instance_type) && !c.is_deleting())
            .collect())
    }

    /// Resume waiting on claims created by an earlier reconcile.
    #[instrument(skip(self, request, cancel), fields(workload = %request.owner))]
    pub async fn wait_for_pending(
        &self,
        request: &ProvisioningRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for claim in self.list_claims(&request.owner).await? {
            if !claim.requests_instance_type(&request.instance_type)
                || claim.is_initialized()
                || claim.is_deleting()
            {
                continue;
            }
            self.wait_for_ready(&claim.name_any(), cancel).await?;
        }
        Ok(())
    }

    /// Delete a claim. A claim that is already gone counts as deleted.
    pub async fn delete_claim(&self, name: &str) -> Result<()> {
        match self.cluster.delete_node_claim(name).await {
            Ok(()) => info!(node_claim = %name, "deleted node claim"),
            Err(err) if is_not_found(&err) => debug!(node_claim = %name, "node claim already gone"),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Converge the workload's claim count on `required`.
    ///
    /// Scale-down removes claims already being deleted first, then claims
    /// that are not provisioned, then the newest.
    #[instrument(skip(self, request), fields(workload = %request.owner))]
    pub async fn sync_claims(&self, request: &ProvisioningRequest, required: u32) -> Result<ClaimSync> {
        let mut claims = self.list_claims(&request.owner).await?;
        let current = claims.len();
        let required_len = usize::try_from(required).unwrap_or(usize::MAX);
        let mut sync = ClaimSync {
            existing: current,
            ..ClaimSync::default()
        };

        match current.cmp(&required_len) {
            Ordering::Less => {
                let to_create = required_len - current;
                info!(current, required, to_create, "creating additional node claims");
                for _ in 0..to_create {
                    let claim = self.create_claim_for(request).await?;
                    sync.created.push(claim.name_any());
                }
            }
            Ordering::Greater => {
                let to_delete = current - required_len;
                info!(current, required, to_delete, "deleting excess node claims");
                claims.sort_by(deletion_order);
                for claim in claims.iter().take(to_delete) {
                    let name = claim.name_any();
                    if !claim.is_deleting() {
                        self.delete_claim(&name).await?;
                    }
                    sync.deleted.push(name);
                }
            }
            Ordering::Equal => debug!(current, "node claim count matches"),
        }
        Ok(sync)
    }

    /// Check that exactly `required` claims exist and all are provisioned.
    pub async fn claims_ready(&self, request: &ProvisioningRequest, required: u32) -> Result<ClaimReadiness> {
        let claims = self.list_claims(&request.owner).await?;
        if claims.len() != usize::try_from(required).unwrap_or(usize::MAX) {
            return Ok(ClaimReadiness::CountMismatch {
                current: claims.len(),
                required,
            });
        }
        if let Some(pending) = claims.iter().find(|c| !c.is_provisioned()) {
            return Ok(ClaimReadiness::NotReady {
                node_claim: pending.name_any(),
            });
        }
        Ok(ClaimReadiness::Ready {
            claims: claims.len(),
        })
    }
}

fn deletion_order(a: &NodeClaim, b: &NodeClaim) -> Ordering {
    b.is_deleting()
        .cmp(&a.is_deleting())
        .then_with(|| a.is_provisioned().cmp(&b.is_provisioned()))
        .then_with(|| b.created_at().cmp(&a.created_at()))
}

fn cancelled(name: &str) -> Error {
    warn!(node_claim = %name, "wait for node claim cancelled");
    Error::Cancelled {
        node_claim: name.to_string(),
    }
}

fn timed_out(name: &str, waited: Duration) -> Error {
    warn!(node_claim = %name, waited_secs = waited.as_secs(), "node claim wait timed out");
    Error::Timeout {
        node_claim: name.to_string(),
        waited,
    }
}

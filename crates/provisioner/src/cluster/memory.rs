//! In-memory cluster for tests and local runs

use super::{matches_labels, ClusterApi, LabelSet};
use crate::crds::{Condition, NodeClaim, NodeClaimStatus, NodeClassKind, NodeClassManifest};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;
use kube::core::ErrorResponse;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Calls that can be counted or made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetNodeClaim,
    CreateNodeClaim,
    DeleteNodeClaim,
    ListNodeClaims,
    GetNodeClass,
    CreateNodeClass,
    ListNodes,
}

#[derive(Default)]
struct State {
    claims: BTreeMap<String, NodeClaim>,
    node_classes: HashSet<(NodeClassKind, String)>,
    nodes: Vec<Node>,
    /// Condition sets applied one per `get`, keyed by claim name
    scripts: HashMap<String, VecDeque<Vec<Condition>>>,
    /// Script copied onto every newly created claim
    launch_script: Vec<Vec<Condition>>,
    failures: HashMap<Operation, VecDeque<u16>>,
    calls: HashMap<Operation, usize>,
}

/// In-memory [`ClusterApi`] with scripted claim progress and failure injection
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every claim created from now on walks through `steps`, one per poll.
    pub fn set_launch_script(&self, steps: Vec<Vec<Condition>>) {
        self.state().launch_script = steps;
    }

    /// The named claim walks through `steps`, one per poll.
    pub fn script_conditions(&self, name: &str, steps: Vec<Vec<Condition>>) {
        self.state()
            .scripts
            .insert(name.to_string(), steps.into_iter().collect());
    }

    pub fn set_conditions(&self, name: &str, conditions: Vec<Condition>) {
        if let Some(claim) = self.state().claims.get_mut(name) {
            claim.status.get_or_insert_with(NodeClaimStatus::default).conditions = conditions;
        }
    }

    /// Fail the next call of `operation` with an API error carrying `code`.
    pub fn fail_next(&self, operation: Operation, code: u16) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(code);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn insert_node_claim(&self, claim: NodeClaim) {
        self.state().claims.insert(claim.name_any(), claim);
    }

    pub fn node_claim(&self, name: &str) -> Option<NodeClaim> {
        self.state().claims.get(name).cloned()
    }

    pub fn node_claims(&self) -> Vec<NodeClaim> {
        self.state().claims.values().cloned().collect()
    }

    pub fn insert_node_class(&self, kind: NodeClassKind, name: &str) {
        self.state().node_classes.insert((kind, name.to_string()));
    }

    pub fn has_node_class(&self, kind: NodeClassKind, name: &str) -> bool {
        self.state()
            .node_classes
            .contains(&(kind, name.to_string()))
    }

    pub fn insert_node(&self, node: Node) {
        self.state().nodes.push(node);
    }

    /// Minimal node with a Ready condition
    pub fn node(name: &str, labels: &LabelSet, ready: bool) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn enter(&self, operation: Operation) -> Result<MutexGuard<'_, State>, kube::Error> {
        let mut state = self.state();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(code) = state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(api_error(code, "InjectedFailure", format!("{operation:?} failed")));
        }
        Ok(state)
    }
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn not_found(kind: &str, name: &str) -> kube::Error {
    api_error(404, "NotFound", format!("{kind} \"{name}\" not found"))
}

fn already_exists(kind: &str, name: &str) -> kube::Error {
    api_error(409, "AlreadyExists", format!("{kind} \"{name}\" already exists"))
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn get_node_claim(&self, name: &str) -> kube::Result<NodeClaim> {
        let mut state = self.enter(Operation::GetNodeClaim)?;
        let next = state.scripts.get_mut(name).and_then(VecDeque::pop_front);
        let claim = state
            .claims
            .get_mut(name)
            .ok_or_else(|| not_found("NodeClaim", name))?;
        if let Some(conditions) = next {
            claim.status.get_or_insert_with(NodeClaimStatus::default).conditions = conditions;
        }
        Ok(claim.clone())
    }

    async fn create_node_claim(&self, claim: &NodeClaim) -> kube::Result<NodeClaim> {
        let mut state = self.enter(Operation::CreateNodeClaim)?;
        let name = claim.name_any();
        if state.claims.contains_key(&name) {
            return Err(already_exists("NodeClaim", &name));
        }
        let mut stored = claim.clone();
        stored.metadata.creation_timestamp = Some(Time(Utc::now()));
        stored.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
        if !state.launch_script.is_empty() && !state.scripts.contains_key(&name) {
            let steps = state.launch_script.iter().cloned().collect();
            state.scripts.insert(name.clone(), steps);
        }
        state.claims.insert(name, stored.clone());
        Ok(stored)
    }

    async fn delete_node_claim(&self, name: &str) -> kube::Result<()> {
        let mut state = self.enter(Operation::DeleteNodeClaim)?;
        state.scripts.remove(name);
        state
            .claims
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("NodeClaim", name))
    }

    async fn list_node_claims(&self, selector: &LabelSet) -> kube::Result<Vec<NodeClaim>> {
        let state = self.enter(Operation::ListNodeClaims)?;
        Ok(state
            .claims
            .values()
            .filter(|c| matches_labels(c.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn node_class_exists(&self, kind: NodeClassKind, name: &str) -> kube::Result<bool> {
        let state = self.enter(Operation::GetNodeClass)?;
        Ok(state.node_classes.contains(&(kind, name.to_string())))
    }

    async fn create_node_class(&self, class: &NodeClassManifest) -> kube::Result<()> {
        let mut state = self.enter(Operation::CreateNodeClass)?;
        let key = (class.kind(), class.name());
        if state.node_classes.contains(&key) {
            return Err(already_exists(class.kind().kind(), &key.1));
        }
        state.node_classes.insert(key);
        Ok(())
    }

    async fn list_nodes(&self, selector: &LabelSet) -> kube::Result<Vec<Node>> {
        let state = self.enter(Operation::ListNodes)?;
        Ok(state
            .nodes
            .iter()
            .filter(|n| matches_labels(n.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }
}

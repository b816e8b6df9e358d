//! Karpenter `NodeClaim` (karpenter.sh/v1)

use super::{ERROR_INSTANCE_TYPES_UNAVAILABLE, LABEL_INSTANCE_TYPE};
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Condition types reported by Karpenter on a `NodeClaim`.
pub const CONDITION_LAUNCHED: &str = "Launched";
pub const CONDITION_INITIALIZED: &str = "Initialized";
pub const CONDITION_READY: &str = "Ready";

/// `NodeClaim` spec: one desired node of a specific instance type
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(group = "karpenter.sh", version = "v1", kind = "NodeClaim")]
#[kube(status = "NodeClaimStatus")]
#[kube(printcolumn = r#"{"name":"Node","type":"string","jsonPath":".status.nodeName"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimSpec {
    /// Cloud-specific node class; absent for pass-through clouds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class_ref: Option<NodeClassReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Scheduling requirements the launched node must satisfy
    #[serde(default)]
    pub requirements: Vec<NodeSelectorRequirement>,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Reference from a claim to its `NodeClass`
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct NodeClassReference {
    pub group: String,
    pub kind: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct Taint {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `NoSchedule`, `PreferNoSchedule` or `NoExecute`
    pub effect: String,
}

/// Node selector requirement with Karpenter's optional `minValues`
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorRequirement {
    pub key: String,
    /// `In`, `NotIn`, `Exists`, `DoesNotExist`, `Gt` or `Lt`
    pub operator: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<u32>,
}

impl NodeSelectorRequirement {
    pub fn is_in(key: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            operator: "In".to_string(),
            values: values.into_iter().map(Into::into).collect(),
            min_values: None,
        }
    }

    pub fn gt(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: "Gt".to_string(),
            values: vec![value.into()],
            min_values: None,
        }
    }
}

/// Resource requests for the claimed node (`storage` only, in practice)
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Status condition as reported by Karpenter
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,

    /// True, False, or Unknown
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(condition_type: impl Into<String>, status: bool) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
            last_transition_time: Some(Utc::now().to_rfc3339()),
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn is_false(&self) -> bool {
        self.status == "False"
    }
}

/// Lifecycle phase derived from a claim's conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClaimPhase {
    /// Accepted by the API server, not yet picked up by the provisioner
    Created,
    Launching,
    /// Node registered and kubelet reporting
    Initialized,
    Ready,
    /// Launch failed because no requested instance type was available
    LaunchFailed,
    Deleted,
}

impl NodeClaimPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Launching => "Launching",
            Self::Initialized => "Initialized",
            Self::Ready => "Ready",
            Self::LaunchFailed => "LaunchFailed",
            Self::Deleted => "Deleted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::LaunchFailed | Self::Deleted)
    }
}

impl fmt::Display for NodeClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeClaim {
    pub fn conditions(&self) -> &[Condition] {
        self.status.as_ref().map_or(&[], |s| s.conditions.as_slice())
    }

    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions()
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    fn condition_is_true(&self, condition_type: &str) -> bool {
        self.condition(condition_type).is_some_and(Condition::is_true)
    }

    pub fn is_ready(&self) -> bool {
        self.condition_is_true(CONDITION_READY)
    }

    pub fn is_initialized(&self) -> bool {
        self.condition_is_true(CONDITION_INITIALIZED)
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// The Ready condition decides when present; otherwise a bound node counts.
    pub fn is_provisioned(&self) -> bool {
        match self.condition(CONDITION_READY) {
            Some(ready) => ready.is_true(),
            None => self
                .status
                .as_ref()
                .and_then(|s| s.node_name.as_deref())
                .is_some_and(|n| !n.is_empty()),
        }
    }

    /// Message of a Launched=False condition reporting that every requested
    /// instance type was unavailable.
    pub fn launch_unavailable_message(&self) -> Option<&str> {
        self.condition(CONDITION_LAUNCHED)
            .filter(|c| c.is_false())
            .and_then(|c| c.message.as_deref())
            .filter(|m| m.contains(ERROR_INSTANCE_TYPES_UNAVAILABLE))
    }

    pub fn phase(&self) -> NodeClaimPhase {
        if self.is_deleting() {
            NodeClaimPhase::Deleted
        } else if self.is_ready() {
            NodeClaimPhase::Ready
        } else if self.launch_unavailable_message().is_some() {
            NodeClaimPhase::LaunchFailed
        } else if self.is_initialized() {
            NodeClaimPhase::Initialized
        } else if self.condition(CONDITION_LAUNCHED).is_some() {
            NodeClaimPhase::Launching
        } else {
            NodeClaimPhase::Created
        }
    }

    /// Instance types listed by the stable instance-type `In` requirement
    pub fn instance_types(&self) -> impl Iterator<Item = &str> {
        self.spec
            .requirements
            .iter()
            .filter(|r| r.key == LABEL_INSTANCE_TYPE && r.operator == "In")
            .flat_map(|r| r.values.iter().map(String::as_str))
    }

    pub fn requests_instance_type(&self, instance_type: &str) -> bool {
        self.instance_types().any(|it| it == instance_type)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.creation_timestamp.as_ref().map(|t| t.0)
    }
}

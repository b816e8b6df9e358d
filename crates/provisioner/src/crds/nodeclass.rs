//! Cloud-specific Karpenter node classes
//!
//! A node class is a cluster singleton every claim points at. Azure uses
//! `AKSNodeClass`, AWS uses `EC2NodeClass`.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const ANNOTATION_DESCRIPTION: &str = "kubernetes.io/description";
/// Tag used by Karpenter on AWS to discover subnets and security groups
pub const TAG_DISCOVERY: &str = "karpenter.sh/discovery";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(group = "karpenter.azure.com", version = "v1alpha2", kind = "AKSNodeClass", derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct AksNodeClassSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_family: Option<String>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(group = "karpenter.k8s.aws", version = "v1beta1", kind = "EC2NodeClass", derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct Ec2NodeClassSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ami_family: Option<String>,

    /// IAM role assumed by launched nodes
    #[serde(default)]
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_store_policy: Option<String>,

    #[serde(default)]
    pub subnet_selector_terms: Vec<SelectorTerm>,

    #[serde(default)]
    pub security_group_selector_terms: Vec<SelectorTerm>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct SelectorTerm {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl SelectorTerm {
    pub fn discovery(cluster_name: &str) -> Self {
        Self {
            tags: BTreeMap::from([(TAG_DISCOVERY.to_string(), cluster_name.to_string())]),
        }
    }
}

/// Which node class resource a cloud uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClassKind {
    Aks,
    Ec2,
}

impl NodeClassKind {
    pub fn group(self) -> &'static str {
        match self {
            Self::Aks => "karpenter.azure.com",
            Self::Ec2 => "karpenter.k8s.aws",
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Aks => "AKSNodeClass",
            Self::Ec2 => "EC2NodeClass",
        }
    }
}

impl fmt::Display for NodeClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A node class ready to be submitted
#[derive(Debug, Clone, PartialEq)]
pub enum NodeClassManifest {
    Aks(AKSNodeClass),
    Ec2(EC2NodeClass),
}

impl NodeClassManifest {
    pub fn kind(&self) -> NodeClassKind {
        match self {
            Self::Aks(_) => NodeClassKind::Aks,
            Self::Ec2(_) => NodeClassKind::Ec2,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Aks(class) => class.name_any(),
            Self::Ec2(class) => class.name_any(),
        }
    }
}

//! Cloud dialects for node-claim selectors and node classes
//!
//! The requirement semantics ("must be this instance type") are the same on
//! every cloud; only the extra selector terms and the node class differ.

use crate::config::ProvisionerConfig;
use crate::crds::{
    AKSNodeClass, AksNodeClassSpec, EC2NodeClass, Ec2NodeClassSpec, NodeClassKind,
    NodeClassManifest, NodeClassReference, NodeSelectorRequirement, SelectorTerm,
    ANNOTATION_DESCRIPTION, LABEL_AWS_GPU_COUNT, LABEL_AZURE_SKU_NAME,
};
use crate::error::{Error, Result};
use gpu::CloudProvider;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const AKS_IMAGE_FAMILY: &str = "Ubuntu2204";
const EC2_AMI_FAMILY: &str = "AL2";
const EC2_INSTANCE_STORE_POLICY: &str = "RAID0";

/// Cloud-specific half of claim generation, selected once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudProvisioner {
    Azure,
    Aws { cluster_name: String },
    /// Arc-connected clusters: Azure SKU names, no node class
    Arc,
}

impl CloudProvisioner {
    pub fn from_config(config: &ProvisionerConfig) -> Result<Self> {
        Ok(match config.cloud_provider {
            CloudProvider::Azure => Self::Azure,
            CloudProvider::Arc => Self::Arc,
            CloudProvider::Aws => {
                let cluster_name = config
                    .cluster_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| {
                        Error::Config("cluster name is required for aws".to_string())
                    })?;
                Self::Aws { cluster_name }
            }
        })
    }

    pub fn cloud(&self) -> CloudProvider {
        match self {
            Self::Azure => CloudProvider::Azure,
            Self::Aws { .. } => CloudProvider::Aws,
            Self::Arc => CloudProvider::Arc,
        }
    }

    pub fn node_class_kind(&self) -> Option<NodeClassKind> {
        match self {
            Self::Azure => Some(NodeClassKind::Aks),
            Self::Aws { .. } => Some(NodeClassKind::Ec2),
            Self::Arc => None,
        }
    }

    pub fn node_class_ref(&self, node_class_name: &str) -> Option<NodeClassReference> {
        self.node_class_kind().map(|kind| NodeClassReference {
            group: kind.group().to_string(),
            kind: kind.kind().to_string(),
            name: node_class_name.to_string(),
        })
    }

    /// Cloud-specific requirements appended after the common ones
    pub fn build_claim_selector(&self, instance_type: &str) -> Vec<NodeSelectorRequirement> {
        match self {
            Self::Azure => vec![NodeSelectorRequirement::is_in(
                LABEL_AZURE_SKU_NAME,
                [instance_type],
            )],
            Self::Aws { .. } => vec![NodeSelectorRequirement::gt(LABEL_AWS_GPU_COUNT, "0")],
            Self::Arc => Vec::new(),
        }
    }

    pub fn build_node_class(&self, name: &str) -> Result<NodeClassManifest> {
        match self {
            Self::Azure => {
                let mut class = AKSNodeClass::new(
                    name,
                    AksNodeClassSpec {
                        image_family: Some(AKS_IMAGE_FAMILY.to_string()),
                    },
                );
                class.metadata = describe(
                    name,
                    "General purpose AKSNodeClass for running Ubuntu 22.04 nodes",
                );
                Ok(NodeClassManifest::Aks(class))
            }
            Self::Aws { cluster_name } => {
                let mut class = EC2NodeClass::new(
                    name,
                    Ec2NodeClassSpec {
                        ami_family: Some(EC2_AMI_FAMILY.to_string()),
                        role: format!("KarpenterNodeRole-{cluster_name}"),
                        // shares the node's ephemeral storage among pods that request it
                        instance_store_policy: Some(EC2_INSTANCE_STORE_POLICY.to_string()),
                        subnet_selector_terms: vec![SelectorTerm::discovery(cluster_name)],
                        security_group_selector_terms: vec![SelectorTerm::discovery(
                            cluster_name,
                        )],
                    },
                );
                class.metadata = describe(
                    name,
                    "General purpose EC2NodeClass for running Amazon Linux 2 nodes",
                );
                Ok(NodeClassManifest::Ec2(class))
            }
            Self::Arc => Err(Error::UnsupportedCloud(CloudProvider::Arc)),
        }
    }
}

fn describe(name: &str, description: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        annotations: Some(BTreeMap::from([(
            ANNOTATION_DESCRIPTION.to_string(),
            description.to_string(),
        )])),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws() -> CloudProvisioner {
        CloudProvisioner::Aws {
            cluster_name: "prod-east".to_string(),
        }
    }

    #[test]
    fn azure_selects_by_sku_name() {
        let terms = CloudProvisioner::Azure.build_claim_selector("Standard_NC12s_v3");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].key, LABEL_AZURE_SKU_NAME);
        assert_eq!(terms[0].operator, "In");
        assert_eq!(terms[0].values, vec!["Standard_NC12s_v3"]);
    }

    #[test]
    fn aws_requires_gpu_count() {
        let terms = aws().build_claim_selector("g5.12xlarge");
        assert_eq!(terms[0].key, LABEL_AWS_GPU_COUNT);
        assert_eq!(terms[0].operator, "Gt");
        assert_eq!(terms[0].values, vec!["0"]);
    }

    #[test]
    fn arc_adds_nothing_and_has_no_class() {
        assert!(CloudProvisioner::Arc.build_claim_selector("x").is_empty());
        assert!(CloudProvisioner::Arc.node_class_ref("default").is_none());
        assert!(matches!(
            CloudProvisioner::Arc.build_node_class("default"),
            Err(Error::UnsupportedCloud(CloudProvider::Arc))
        ));
    }

    #[test]
    fn aws_node_class_uses_cluster_name() {
        let NodeClassManifest::Ec2(class) = aws().build_node_class("default").unwrap() else {
            panic!("expected EC2NodeClass");
        };
        assert_eq!(class.spec.role, "KarpenterNodeRole-prod-east");
        assert_eq!(class.spec.ami_family.as_deref(), Some("AL2"));
        assert_eq!(class.spec.instance_store_policy.as_deref(), Some("RAID0"));
        assert_eq!(
            class.spec.subnet_selector_terms[0].tags["karpenter.sh/discovery"],
            "prod-east"
        );
        assert_eq!(class.spec.security_group_selector_terms.len(), 1);
    }

    #[test]
    fn azure_node_class_is_ubuntu() {
        let manifest = CloudProvisioner::Azure.build_node_class("default").unwrap();
        assert_eq!(manifest.kind(), NodeClassKind::Aks);
        assert_eq!(manifest.name(), "default");
        let NodeClassManifest::Aks(class) = manifest else {
            panic!("expected AKSNodeClass");
        };
        assert_eq!(class.spec.image_family.as_deref(), Some("Ubuntu2204"));
    }

    #[test]
    fn node_class_ref_matches_kind() {
        let reference = aws().node_class_ref("default").unwrap();
        assert_eq!(reference.kind, "EC2NodeClass");
        assert_eq!(reference.group, "karpenter.k8s.aws");
    }

    #[test]
    fn aws_requires_cluster_name() {
        let config = ProvisionerConfig::new(CloudProvider::Aws);
        assert!(CloudProvisioner::from_config(&config).is_err());
        let config = config.with_cluster_name("prod-east");
        assert_eq!(CloudProvisioner::from_config(&config).unwrap(), aws());
    }
}

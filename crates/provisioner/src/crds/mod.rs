//! Custom resources owned by the node provisioner (Karpenter).
//!
//! Only the fields this crate reads or writes are modelled; unknown fields
//! returned by the API server are ignored on deserialization.

pub mod nodeclaim;
pub mod nodeclass;

pub use nodeclaim::*;
pub use nodeclass::*;

/// Label placing a node in a Karpenter node pool.
pub const LABEL_NODE_POOL: &str = "karpenter.sh/nodepool";
/// Well-known instance-type node label.
pub const LABEL_INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";
/// Well-known OS node label.
pub const LABEL_OS: &str = "kubernetes.io/os";
/// Annotation that stops Karpenter from disrupting a node.
pub const ANNOTATION_DO_NOT_DISRUPT: &str = "karpenter.sh/do-not-disrupt";
/// Azure SKU-name requirement key.
pub const LABEL_AZURE_SKU_NAME: &str = "karpenter.azure.com/sku-name";
/// AWS GPU-count requirement key.
pub const LABEL_AWS_GPU_COUNT: &str = "karpenter.k8s.aws/instance-gpu-count";

/// Owner workload name label on every claim.
pub const LABEL_WORKLOAD_NAME: &str = "capacity.platform/workload-name";
/// Owner workload namespace label on every claim.
pub const LABEL_WORKLOAD_NAMESPACE: &str = "capacity.platform/workload-namespace";

/// Taint key keeping non-GPU pods off claimed nodes.
pub const TAINT_KEY_SKU: &str = "sku";
/// Taint value paired with [`TAINT_KEY_SKU`].
pub const TAINT_VALUE_GPU: &str = "gpu";

/// Launch failure message Karpenter reports when no requested SKU can be had.
pub const ERROR_INSTANCE_TYPES_UNAVAILABLE: &str =
    "all requested instance types were unavailable during launch";

//! Model resource profiles.

use serde::{Deserialize, Serialize};

use crate::error::CapacityError;
use crate::size::{parse_requirement_to_gib, parse_size_to_gib};

/// Architecture family, as far as memory planning cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Falcon keeps a full copy of the weights on every node of a replica.
    Falcon,
    /// Weights and per-token state are sharded across every GPU of a replica.
    Sharded,
}

impl ModelFamily {
    /// Classify a model by name.
    ///
    /// This is a substring heuristic. New families that replicate weights
    /// per node belong here rather than in the planner.
    #[must_use]
    pub fn classify(model_name: &str) -> Self {
        if model_name.to_lowercase().contains("falcon") {
            Self::Falcon
        } else {
            Self::Sharded
        }
    }

    /// Whether every node holds the full weights instead of a shard.
    #[must_use]
    pub fn replicates_weights_per_node(self) -> bool {
        matches!(self, Self::Falcon)
    }
}

/// Resource profile of a catalogued model preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResourceProfile {
    /// Preset name, e.g. "phi-4" or "falcon-7b-instruct".
    pub model_name: String,

    /// Hard upper bound on context length, in tokens.
    pub hard_token_limit: u32,

    /// Empirical KV-cache and activation cost of one token, in bytes.
    pub bytes_per_token: u64,

    /// Size of all weight files, e.g. "25.63Gi".
    pub total_weight_size: String,

    /// Aggregate GPU memory the whole model needs, e.g. "32Gi".
    pub total_gpu_memory_requirement: String,

    /// GPUs per node to request when the instance type is not catalogued.
    #[serde(default = "default_gpu_count_requirement")]
    pub gpu_count_requirement: u32,

    /// Node OS disk size the model needs, e.g. "512Gi".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_storage_requirement: Option<String>,
}

fn default_gpu_count_requirement() -> u32 {
    1
}

impl ModelResourceProfile {
    /// Family derived from the model name.
    #[must_use]
    pub fn family(&self) -> ModelFamily {
        ModelFamily::classify(&self.model_name)
    }

    /// Weight size in GiB, `None` when the size string does not parse.
    #[must_use]
    pub fn weight_gib(&self) -> Option<f64> {
        parse_size_to_gib(&self.total_weight_size).ok()
    }

    /// Aggregate GPU memory requirement in GiB. Zero is allowed.
    pub fn total_gpu_memory_gib(&self) -> Result<f64, CapacityError> {
        parse_requirement_to_gib(&self.total_gpu_memory_requirement).map_err(|err| {
            CapacityError::InvalidProfile {
                model: self.model_name.clone(),
                reason: format!("totalGpuMemoryRequirement: {err}"),
            }
        })
    }
}

//! Node-count estimation.
//!
//! Given a model's aggregate GPU memory requirement and the capacity of
//! the requested instance type, compute the smallest number of nodes that
//! holds the model. The estimate only ever consolidates: it never returns
//! more nodes than the user asked for.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{GpuCapacity, GpuCatalog};
use crate::error::CapacityError;
use crate::profile::ModelResourceProfile;
use crate::size::{gib_to_bytes, GIB};

/// Node count used when the workload does not specify one.
pub const DEFAULT_NODE_COUNT: u32 = 1;

/// Smallest node count whose aggregate GPU memory covers `required_gib`.
///
/// Ceiling division: a requirement that is an exact multiple of the node
/// capacity needs exactly that many nodes, anything above needs one more.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn minimum_nodes(required_gib: f64, capacity: &GpuCapacity) -> u64 {
    let per_node = (f64::from(capacity.gpu_memory_gib) * GIB) as u64;
    if per_node == 0 {
        return 0;
    }
    gib_to_bytes(required_gib).div_ceil(per_node)
}

/// Sizes workloads against a GPU catalog.
#[derive(Debug, Clone)]
pub struct CapacityEstimator {
    catalog: Arc<GpuCatalog>,
}

impl CapacityEstimator {
    #[must_use]
    pub fn new(catalog: Arc<GpuCatalog>) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &GpuCatalog {
        &self.catalog
    }

    /// Estimate how many nodes a workload needs.
    ///
    /// Returns `requested` (or [`DEFAULT_NODE_COUNT`]) unchanged when the
    /// workload has no profile or the profile has no preset name. Otherwise
    /// the instance type must be catalogued, and the result is
    /// `min(requested, minimum_nodes)` unless the minimum is zero.
    ///
    /// # Errors
    /// [`CapacityError::GpuConfigNotFound`] for an uncatalogued instance
    /// type, [`CapacityError::InvalidProfile`] for an unparsable memory
    /// requirement. Neither is worth retrying with the same input.
    pub fn estimate(
        &self,
        profile: Option<&ModelResourceProfile>,
        requested: Option<u32>,
        instance_type: &str,
    ) -> Result<u32, CapacityError> {
        let requested = requested.unwrap_or(DEFAULT_NODE_COUNT);

        let Some(profile) = profile.filter(|p| !p.model_name.trim().is_empty()) else {
            debug!(requested, "No model preset, keeping requested node count");
            return Ok(requested);
        };

        let capacity = self.catalog.lookup(instance_type)?;
        let required_gib = profile.total_gpu_memory_gib()?;
        let minimum = minimum_nodes(required_gib, capacity);

        if minimum == 0 {
            return Ok(requested);
        }

        match u32::try_from(minimum) {
            Ok(minimum) if minimum < requested => {
                info!(
                    model = %profile.model_name,
                    instance_type,
                    requested,
                    minimum,
                    "Consolidating workload onto fewer nodes"
                );
                Ok(minimum)
            }
            _ => Ok(requested),
        }
    }

    /// GPUs to request per node: the catalogued count, or the profile's
    /// fallback when the instance type is unknown.
    #[must_use]
    pub fn gpus_per_node(&self, profile: &ModelResourceProfile, instance_type: &str) -> u32 {
        self.catalog.get(instance_type).map_or_else(
            || profile.gpu_count_requirement.max(1),
            |capacity| capacity.gpu_count,
        )
    }
}

//! Maximum context-length planning.
//!
//! Estimates the largest context length that fits in GPU memory once the
//! weights and a static overhead are reserved. The result is advisory:
//! zero means "no suggestion" and the caller keeps its own default.

use tracing::{debug, info};

use crate::catalog::GpuCapacity;
use crate::profile::ModelResourceProfile;
use crate::size::GIB;

/// Fraction of GPU memory considered usable.
pub const GPU_UTILIZATION: f64 = 0.82;
/// Multiplier applied to the on-disk weight size to get resident size.
pub const WEIGHT_OVERHEAD: f64 = 1.02;
/// Runtime and fragmentation reserve per GPU, in GiB.
pub const STATIC_OVERHEAD_GIB: f64 = 2.3;
/// Context lengths are aligned down to this many tokens.
pub const TOKEN_ALIGNMENT: u32 = 256;

/// Plan a maximum context length in tokens.
///
/// Returns 0 if any input is non-positive, if the weight size does not
/// parse, or if the weights leave no room for tokens. A positive result
/// is a multiple of [`TOKEN_ALIGNMENT`] and never exceeds the model's
/// hard token limit.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn plan_context_length(
    profile: &ModelResourceProfile,
    capacity: &GpuCapacity,
    nodes_per_replica: u32,
) -> u32 {
    if profile.hard_token_limit == 0
        || profile.bytes_per_token == 0
        || capacity.gpu_memory_gib == 0
        || capacity.gpu_count == 0
        || nodes_per_replica == 0
    {
        return 0;
    }

    let Some(weight_gib) = profile.weight_gib() else {
        debug!(
            model = %profile.model_name,
            weight = %profile.total_weight_size,
            "Unparsable weight size, skipping context-length planning"
        );
        return 0;
    };

    let gpu_count = f64::from(capacity.gpu_count);
    let shards = f64::from(nodes_per_replica) * gpu_count;
    let replicated = profile.family().replicates_weights_per_node();
    #[allow(clippy::cast_precision_loss)]
    let bytes_per_token = profile.bytes_per_token as f64;

    let usable_per_gpu = f64::from(capacity.gpu_memory_gib) * GPU_UTILIZATION / gpu_count;
    let weights = if replicated {
        weight_gib * WEIGHT_OVERHEAD
    } else {
        weight_gib * WEIGHT_OVERHEAD / shards
    };
    let free_gib = usable_per_gpu - weights - STATIC_OVERHEAD_GIB;
    if free_gib <= 0.0 {
        debug!(
            model = %profile.model_name,
            instance_type = %capacity.instance_type,
            free_gib,
            "Weights leave no room for context"
        );
        return 0;
    }

    let per_token = if replicated {
        bytes_per_token
    } else {
        bytes_per_token / shards
    };
    if per_token <= 0.0 {
        return 0;
    }

    let raw = (free_gib * GIB / per_token).floor();
    let mut candidate = if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    };

    if candidate > profile.hard_token_limit {
        info!(
            model = %profile.model_name,
            from = candidate,
            to = profile.hard_token_limit,
            "Clamped planned context length to model token limit"
        );
        candidate = profile.hard_token_limit;
    }

    candidate / TOKEN_ALIGNMENT * TOKEN_ALIGNMENT
}

/// Pick the context length to configure.
///
/// An explicit user value always wins; otherwise the planned value is used
/// only when it is strictly positive.
#[must_use]
pub fn resolve_max_model_len(explicit: Option<u32>, planned: u32) -> Option<u32> {
    explicit.or((planned > 0).then_some(planned))
}

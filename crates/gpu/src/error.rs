//! Sizing errors.

use thiserror::Error;

/// Errors returned by the catalog, estimator and size parser.
///
/// All of these are validation errors: retrying without changing the input
/// produces the same result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// The instance type has no entry in the active GPU catalog.
    #[error("GPU config is nil for instance type {instance_type}")]
    GpuConfigNotFound { instance_type: String },

    /// A model resource profile field is missing or malformed.
    #[error("invalid resource profile for model {model}: {reason}")]
    InvalidProfile { model: String, reason: String },

    /// A human-readable size string could not be parsed.
    #[error("invalid size string {0:?}: expected a number followed by Ti, Gi or Mi")]
    InvalidSize(String),

    /// The cloud identity is not one of the supported providers.
    #[error("unsupported cloud provider {0:?}")]
    UnsupportedCloud(String),
}

impl CapacityError {
    /// Stable reason code surfaced on workload status conditions.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::GpuConfigNotFound { .. } => "GPUConfigNotFound",
            Self::InvalidProfile { .. } => "InvalidResourceProfile",
            Self::InvalidSize(_) => "InvalidSize",
            Self::UnsupportedCloud(_) => "UnsupportedCloudProvider",
        }
    }
}

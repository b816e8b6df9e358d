//! Cloud identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CapacityError;

/// Cloud the cluster runs on. Selects the GPU catalog and the node-claim dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    /// Azure Kubernetes Service.
    Azure,
    /// Amazon EKS.
    Aws,
    /// Azure Arc-connected clusters. Uses Azure SKU names, provisions nothing itself.
    Arc,
}

impl CloudProvider {
    /// Identity string as it appears in `CLOUD_PROVIDER`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::Aws => "aws",
            Self::Arc => "arc",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = CapacityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "aws" => Ok(Self::Aws),
            "arc" => Ok(Self::Arc),
            _ => Err(CapacityError::UnsupportedCloud(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("AWS".parse::<CloudProvider>(), Ok(CloudProvider::Aws));
        assert_eq!(" azure ".parse::<CloudProvider>(), Ok(CloudProvider::Azure));
        assert_eq!("arc".parse::<CloudProvider>(), Ok(CloudProvider::Arc));
    }

    #[test]
    fn rejects_unknown_cloud() {
        let err = "gcp".parse::<CloudProvider>().unwrap_err();
        assert_eq!(err, CapacityError::UnsupportedCloud("gcp".to_string()));
        assert_eq!(err.reason(), "UnsupportedCloudProvider");
    }

    #[test]
    fn display_round_trips_identity() {
        assert_eq!(CloudProvider::Azure.to_string(), "azure");
    }
}

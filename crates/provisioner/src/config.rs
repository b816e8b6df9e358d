//! Provisioner configuration
//!
//! Loaded once at startup, either from a mounted YAML file or from the
//! process environment, and handed to each component at construction.

use crate::error::{Error, Result};
use gpu::CloudProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_CLOUD_PROVIDER: &str = "CLOUD_PROVIDER";
pub const ENV_CLUSTER_NAME: &str = "CLUSTER_NAME";
pub const ENV_FEATURE_GATES: &str = "FEATURE_GATES";

pub const FEATURE_ENSURE_NODE_CLASS: &str = "ensureNodeClass";
pub const FEATURE_DISABLE_NODE_AUTO_PROVISIONING: &str = "disableNodeAutoProvisioning";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerConfig {
    pub cloud_provider: CloudProvider,

    /// Required on AWS for the node role and discovery tags
    #[serde(default)]
    pub cluster_name: Option<String>,

    #[serde(default)]
    pub feature_gates: FeatureGates,

    #[serde(default)]
    pub wait: WaitConfig,

    /// Private node pool claims are placed in so the autoscaler leaves them alone
    #[serde(default = "default_node_pool_name")]
    pub node_pool_name: String,

    #[serde(default = "default_node_class_name")]
    pub node_class_name: String,

    /// Storage request used when the workload does not specify one
    #[serde(default = "default_storage")]
    pub default_storage: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGates {
    /// Create the node class on first claim if it is missing
    #[serde(default)]
    pub ensure_node_class: bool,

    /// All capacity is pre-existing; never create claims
    #[serde(default)]
    pub disable_node_auto_provisioning: bool,
}

impl FeatureGates {
    /// Parse a `name=bool` comma list, e.g. `ensureNodeClass=true`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut gates = Self::default();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid feature gate '{pair}'")))?;
            let enabled = value.trim().parse::<bool>().map_err(|_| {
                Error::Config(format!("invalid value for feature gate {name}: {value}"))
            })?;
            match name.trim() {
                FEATURE_ENSURE_NODE_CLASS => gates.ensure_node_class = enabled,
                FEATURE_DISABLE_NODE_AUTO_PROVISIONING => {
                    gates.disable_node_auto_provisioning = enabled;
                }
                other => return Err(Error::Config(format!("unknown feature gate {other}"))),
            }
        }
        Ok(gates)
    }
}

/// Poll cadence and deadline for `wait_for_ready`
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitConfig {
    #[serde(
        rename = "pollIntervalMillis",
        with = "duration_millis",
        default = "default_poll_interval"
    )]
    pub poll_interval: Duration,

    #[serde(
        rename = "deadlineSeconds",
        with = "duration_secs",
        default = "default_deadline"
    )]
    pub deadline: Duration,
}

impl WaitConfig {
    pub fn new(poll_interval: Duration, deadline: Duration) -> Self {
        Self {
            poll_interval,
            deadline,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(default_poll_interval(), default_deadline())
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_deadline() -> Duration {
    Duration::from_secs(240)
}

fn default_node_pool_name() -> String {
    "kaito".to_string()
}

fn default_node_class_name() -> String {
    "default".to_string()
}

fn default_storage() -> String {
    "1024Gi".to_string()
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl ProvisionerConfig {
    pub fn new(cloud_provider: CloudProvider) -> Self {
        Self {
            cloud_provider,
            cluster_name: None,
            feature_gates: FeatureGates::default(),
            wait: WaitConfig::default(),
            node_pool_name: default_node_pool_name(),
            node_class_name: default_node_class_name(),
            default_storage: default_storage(),
        }
    }

    #[must_use]
    pub fn with_cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster_name.into());
        self
    }

    #[must_use]
    pub fn with_feature_gates(mut self, feature_gates: FeatureGates) -> Self {
        self.feature_gates = feature_gates;
        self
    }

    #[must_use]
    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait.poll_interval.is_zero() || self.wait.deadline.is_zero() {
            return Err(Error::Config(
                "wait.pollIntervalMillis and wait.deadlineSeconds must be greater than zero"
                    .to_string(),
            ));
        }
        if self.wait.poll_interval >= self.wait.deadline {
            return Err(Error::Config(format!(
                "poll interval {:?} must be shorter than the deadline {:?}",
                self.wait.poll_interval, self.wait.deadline
            )));
        }
        if self.node_pool_name.trim().is_empty() || self.node_class_name.trim().is_empty() {
            return Err(Error::Config(
                "nodePoolName and nodeClassName must not be empty".to_string(),
            ));
        }
        gpu::parse_size_to_gib(&self.default_storage)
            .map_err(|e| Error::Config(format!("invalid defaultStorage: {e}")))?;
        if self.cloud_provider == CloudProvider::Aws
            && !self
                .cluster_name
                .as_deref()
                .is_some_and(|n| !n.trim().is_empty())
        {
            return Err(Error::Config(format!(
                "{ENV_CLUSTER_NAME} is required when the cloud provider is aws"
            )));
        }
        Ok(())
    }

    /// Load configuration from mounted `ConfigMap` file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        let config: ProvisionerConfig = serde_yaml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CLOUD_PROVIDER`, `CLUSTER_NAME` and `FEATURE_GATES`
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let cloud = std::env::var(ENV_CLOUD_PROVIDER)
            .map_err(|_| anyhow::anyhow!("{ENV_CLOUD_PROVIDER} is not set"))?;
        let mut config = Self::new(cloud.parse::<CloudProvider>()?);

        config.cluster_name = std::env::var(ENV_CLUSTER_NAME)
            .ok()
            .filter(|n| !n.trim().is_empty());
        if let Ok(raw) = std::env::var(ENV_FEATURE_GATES) {
            config.feature_gates = FeatureGates::parse(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn defaults_match_karpenter_conventions() {
        let config = ProvisionerConfig::new(CloudProvider::Azure);
        assert_eq!(config.node_pool_name, "kaito");
        assert_eq!(config.node_class_name, "default");
        assert_eq!(config.default_storage, "1024Gi");
        assert_eq!(config.wait.poll_interval, Duration::from_secs(1));
        assert_eq!(config.wait.deadline, Duration::from_secs(240));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_yaml() {
        let yaml = r"
cloudProvider: aws
clusterName: prod-east
featureGates:
  ensureNodeClass: true
wait:
  pollIntervalMillis: 500
  deadlineSeconds: 60
";
        let config: ProvisionerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cloud_provider, CloudProvider::Aws);
        assert_eq!(config.cluster_name.as_deref(), Some("prod-east"));
        assert!(config.feature_gates.ensure_node_class);
        assert!(!config.feature_gates.disable_node_auto_provisioning);
        assert_eq!(config.wait.poll_interval, Duration::from_millis(500));
        assert_eq!(config.wait.deadline, Duration::from_secs(60));
        assert_eq!(config.node_pool_name, "kaito");
    }

    #[test]
    fn loads_mounted_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cloudProvider: azure\nnodeClassName: gpu").unwrap();
        let config =
            ProvisionerConfig::from_mounted_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.cloud_provider, CloudProvider::Azure);
        assert_eq!(config.node_class_name, "gpu");
    }

    #[test]
    fn rejects_aws_without_cluster_name() {
        let err = ProvisionerConfig::new(CloudProvider::Aws)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("CLUSTER_NAME"));
        assert!(ProvisionerConfig::new(CloudProvider::Aws)
            .with_cluster_name("prod")
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_poll_longer_than_deadline() {
        let config = ProvisionerConfig::new(CloudProvider::Azure)
            .with_wait(WaitConfig::new(Duration::from_secs(10), Duration::from_secs(5)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_feature_gates() {
        let gates =
            FeatureGates::parse("ensureNodeClass=true, disableNodeAutoProvisioning=false").unwrap();
        assert!(gates.ensure_node_class);
        assert!(!gates.disable_node_auto_provisioning);
        assert_eq!(FeatureGates::parse("").unwrap(), FeatureGates::default());
        assert!(FeatureGates::parse("vLLM=true").is_err());
        assert!(FeatureGates::parse("ensureNodeClass").is_err());
        assert!(FeatureGates::parse("ensureNodeClass=yes").is_err());
    }

    #[test]
    #[serial]
    fn loads_from_env() {
        std::env::set_var(ENV_CLOUD_PROVIDER, "AWS");
        std::env::set_var(ENV_CLUSTER_NAME, "prod-east");
        std::env::set_var(ENV_FEATURE_GATES, "disableNodeAutoProvisioning=true");

        let config = ProvisionerConfig::from_env().unwrap();
        assert_eq!(config.cloud_provider, CloudProvider::Aws);
        assert_eq!(config.cluster_name.as_deref(), Some("prod-east"));
        assert!(config.feature_gates.disable_node_auto_provisioning);

        std::env::remove_var(ENV_CLOUD_PROVIDER);
        std::env::remove_var(ENV_CLUSTER_NAME);
        std::env::remove_var(ENV_FEATURE_GATES);
    }

    #[test]
    #[serial]
    fn env_requires_cloud_provider() {
        std::env::remove_var(ENV_CLOUD_PROVIDER);
        assert!(ProvisionerConfig::from_env().is_err());
    }
}

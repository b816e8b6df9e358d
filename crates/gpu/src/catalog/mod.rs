//! Static per-cloud GPU catalogs.
//!
//! Each catalog maps an instance type to the GPU capacity of one node of
//! that type. `gpu_memory_gib` is the aggregate memory of all GPUs on the
//! node, so per-GPU memory is `gpu_memory_gib / gpu_count`.
//!
//! Catalogs are immutable after construction and are shared freely across
//! reconcilers behind an `Arc`.

mod aws;
mod azure;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cloud::CloudProvider;
use crate::error::CapacityError;

/// GPU capacity of one node of a given instance type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuCapacity {
    /// Instance type (SKU) name, in its canonical casing.
    pub instance_type: String,
    /// Number of GPUs on the node.
    pub gpu_count: u32,
    /// Aggregate GPU memory across the node, in GiB.
    pub gpu_memory_gib: u32,
    /// GPU model, e.g. "NVIDIA A100".
    pub gpu_model: String,
    /// Whether the node has local NVMe disks usable for model caching.
    pub local_nvme_disk_enabled: bool,
}

impl GpuCapacity {
    /// Memory of a single GPU in GiB.
    #[must_use]
    pub fn memory_per_gpu_gib(&self) -> f64 {
        f64::from(self.gpu_memory_gib) / f64::from(self.gpu_count.max(1))
    }
}

/// Row in a static catalog table.
pub(crate) struct SkuEntry {
    pub sku: &'static str,
    pub gpu_count: u32,
    pub gpu_memory_gib: u32,
    pub gpu_model: &'static str,
    pub nvme: bool,
}

/// Catalog row without local NVMe.
pub(crate) const fn sku(
    sku: &'static str,
    gpu_count: u32,
    gpu_memory_gib: u32,
    gpu_model: &'static str,
) -> SkuEntry {
    SkuEntry {
        sku,
        gpu_count,
        gpu_memory_gib,
        gpu_model,
        nvme: false,
    }
}

/// Catalog row with local NVMe.
pub(crate) const fn nvme(
    sku: &'static str,
    gpu_count: u32,
    gpu_memory_gib: u32,
    gpu_model: &'static str,
) -> SkuEntry {
    SkuEntry {
        nvme: true,
        ..self::sku(sku, gpu_count, gpu_memory_gib, gpu_model)
    }
}

impl From<&SkuEntry> for GpuCapacity {
    fn from(entry: &SkuEntry) -> Self {
        Self {
            instance_type: entry.sku.to_string(),
            gpu_count: entry.gpu_count,
            gpu_memory_gib: entry.gpu_memory_gib,
            gpu_model: entry.gpu_model.to_string(),
            local_nvme_disk_enabled: entry.nvme,
        }
    }
}

/// Instance-type to GPU capacity lookup for one cloud.
#[derive(Debug, Clone, Default)]
pub struct GpuCatalog {
    exact: HashMap<String, GpuCapacity>,
    folded: HashMap<String, GpuCapacity>,
}

impl GpuCatalog {
    /// Build a catalog from explicit entries. Later duplicates win.
    pub fn new(entries: impl IntoIterator<Item = GpuCapacity>) -> Self {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        for capacity in entries {
            folded.insert(capacity.instance_type.to_lowercase(), capacity.clone());
            exact.insert(capacity.instance_type.clone(), capacity);
        }
        Self { exact, folded }
    }

    /// Built-in catalog for a cloud. Arc-connected clusters use Azure SKU names.
    #[must_use]
    pub fn for_cloud(cloud: CloudProvider) -> Self {
        let table = match cloud {
            CloudProvider::Aws => aws::SKUS,
            CloudProvider::Azure | CloudProvider::Arc => azure::SKUS,
        };
        Self::new(table.iter().map(GpuCapacity::from))
    }

    /// Look up an instance type.
    ///
    /// An exact match is tried first so historically-cased keys keep
    /// resolving to themselves; a case-folded match is the fallback.
    pub fn lookup(&self, instance_type: &str) -> Result<&GpuCapacity, CapacityError> {
        self.get(instance_type)
            .ok_or_else(|| CapacityError::GpuConfigNotFound {
                instance_type: instance_type.to_string(),
            })
    }

    /// Same as [`GpuCatalog::lookup`] but returns `None` on a miss.
    #[must_use]
    pub fn get(&self, instance_type: &str) -> Option<&GpuCapacity> {
        if let Some(capacity) = self.exact.get(instance_type) {
            return Some(capacity);
        }
        let found = self.folded.get(&instance_type.to_lowercase());
        if found.is_some() {
            debug!(instance_type, "GPU catalog hit via case-insensitive fallback");
        }
        found
    }

    /// All instance types in the catalog, sorted.
    #[must_use]
    pub fn supported_instance_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.exact.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

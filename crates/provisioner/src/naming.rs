//! Node-claim names
//!
//! Names are derived from the owner plus a fresh ID so repeated claims for the
//! same workload never reuse a name.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

const NAME_PREFIX: &str = "ws";
const HASH_CHARS: usize = 9;

/// Source of per-claim unique IDs
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic counter, for tests and replay
#[derive(Debug, Default)]
pub struct SequenceIdSource {
    next: AtomicU64,
}

impl SequenceIdSource {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdSource for SequenceIdSource {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// `ws` followed by the first 9 hex chars of sha256(namespace + name + id)
pub fn node_claim_name(namespace: &str, name: &str, id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(name.as_bytes());
    hasher.update(id.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{NAME_PREFIX}{}", &digest[..HASH_CHARS])
}

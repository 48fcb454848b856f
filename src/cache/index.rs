//! Cache Index Module
//!
//! The single persisted record listing live cache keys, a running size
//! estimate and the time of the last full pass.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::key::CACHE_INDEX_KEY;
use crate::storage::StorageAdapter;

// == Cache Index ==
/// Index of live cache keys.
///
/// `total_size` is a best-effort running total. It is adjusted on every
/// write and removal and only recomputed from the stored entries by full
/// passes (forced eviction, expiration sweep), so it may drift when the
/// medium changes behind the engine's back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheIndex {
    /// Keys believed to hold live entries
    pub keys: BTreeSet<String>,
    /// Estimated sum of entry sizes in bytes
    pub total_size: u64,
    /// Time of the last reconciling pass (Unix milliseconds)
    pub last_cleanup: i64,
}

impl CacheIndex {
    /// An index with no keys.
    pub fn empty(now: i64) -> Self {
        Self {
            keys: BTreeSet::new(),
            total_size: 0,
            last_cleanup: now,
        }
    }

    // == Load ==
    /// Reads the index from storage.
    ///
    /// A missing or unparsable record yields an empty index; readers then
    /// just see misses.
    pub fn load(storage: &dyn StorageAdapter, now: i64) -> Self {
        let Some(raw) = storage.get(CACHE_INDEX_KEY) else {
            return Self::empty(now);
        };

        match serde_json::from_str(&raw) {
            Ok(index) => index,
            Err(e) => {
                warn!("Failed to read cache index, starting empty: {}", e);
                Self::empty(now)
            }
        }
    }

    // == Save ==
    /// Persists the index. Failures are logged and swallowed.
    pub fn save(&self, storage: &mut dyn StorageAdapter) {
        let raw = match serde_json::to_string(self) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode cache index: {}", e);
                return;
            }
        };

        if let Err(e) = storage.set(CACHE_INDEX_KEY, &raw) {
            warn!("Failed to save cache index: {}", e);
        }
    }

    /// Returns true if `key` is tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Tracks `key`. Returns true if it was not tracked before.
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Stops tracking `key`. Returns true if it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

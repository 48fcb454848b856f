//! Cache Statistics Module
//!
//! Snapshot and report types returned by the engine's read and maintenance
//! passes.

use serde::{Deserialize, Serialize};

// == Item Stats ==
/// One live (or not yet swept) entry as seen by a stats walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItemStats {
    /// Key without the cache prefix
    pub key: String,
    /// Estimated stored size in bytes
    pub size: u64,
    /// Milliseconds since the entry was written
    pub age_ms: u64,
    /// Configured lifetime in milliseconds
    pub ttl_ms: u64,
    /// Past its TTL but not yet removed
    pub expired: bool,
}

// == Cache Stats ==
/// Aggregate view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries found
    pub count: usize,
    /// Sum of entry sizes in bytes
    pub total_size: u64,
    /// Size of the persisted index record in bytes
    pub index_size: u64,
    /// Bytes the whole storage medium charges against its quota, cache and
    /// user data together
    pub storage_used: u64,
    /// Per-entry breakdown
    pub items: Vec<CacheItemStats>,
}

impl CacheStats {
    /// Builds aggregates from the per-entry breakdown.
    pub fn from_items(items: Vec<CacheItemStats>, index_size: u64, storage_used: u64) -> Self {
        Self {
            count: items.len(),
            total_size: items.iter().map(|i| i.size).sum(),
            index_size,
            storage_used,
            items,
        }
    }

    /// Entries that are past their TTL and awaiting a sweep.
    pub fn expired_count(&self) -> usize {
        self.items.iter().filter(|i| i.expired).count()
    }
}

// == Sweep Report ==
/// Outcome of a passive expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Entries removed for being past their TTL
    pub expired: usize,
    /// Entries removed because they failed to parse
    pub corrupted: usize,
    /// Index keys with nothing stored behind them
    pub missing: usize,
    /// Entries kept
    pub live: usize,
    /// Exact size of the kept entries in bytes
    pub total_size: u64,
}

impl SweepReport {
    /// Total number of index keys dropped.
    pub fn removed(&self) -> usize {
        self.expired + self.corrupted + self.missing
    }
}

// == Eviction Report ==
/// Outcome of a forced eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Live entries removed to make room
    pub evicted: usize,
    /// Entries removed because they failed to parse
    pub corrupted: usize,
    /// Bytes released by eviction
    pub freed_bytes: u64,
    /// Size of the entries left behind
    pub remaining_bytes: u64,
}

// == Clear Report ==
/// Result of the user-facing "clear cache" action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    /// Cache entries plus ephemeral keys removed
    pub cleared_count: usize,
    /// Their combined estimated size in bytes
    pub total_size: u64,
}

// == Clearable Stats ==
/// What the "clear cache" action would remove, shown before confirming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearableStats {
    pub count: usize,
    pub size: u64,
}

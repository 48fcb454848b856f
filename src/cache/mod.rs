//! Cache Module
//!
//! Persistent metadata cache with TTL expiration and size-bounded eviction.

mod engine;
mod entry;
mod index;
mod key;
mod partition;
mod size;
mod stats;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{run_locked, CacheEngine, Lookup, SharedEngine};
pub use entry::{CacheEntry, EntryMeta};
pub use index::CacheIndex;
pub use key::{display_key, is_entry_key, make_key, CACHE_INDEX_KEY, CACHE_PREFIX};
pub use partition::{KeyClass, UserDataPolicy, EPHEMERAL_KEYS, RETAINED_KEYS};
pub use size::estimate_size;
pub use stats::{
    CacheItemStats, CacheStats, ClearReport, ClearableStats, EvictionReport, SweepReport,
};
pub use ttl::{TtlCategory, TtlConfig};

//! Cache Entry Module
//!
//! Defines the persisted envelope around every cached value.

use std::time::Duration;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A cached value with its write time and time-to-live.
///
/// Serialized as `{"data": …, "timestamp": …, "ttl": …}`. Entries are never
/// mutated in place; a second write to the same key replaces the whole
/// envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// Write time (Unix milliseconds)
    pub timestamp: i64,
    /// Time-to-live in milliseconds
    pub ttl: u64,
}

/// Envelope with the payload skipped, for walks that only need metadata.
///
/// Parsing still fails when `data` is missing, so a wrong-shaped record is
/// treated as corrupt by index walks too.
pub type EntryMeta = CacheEntry<IgnoredAny>;

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Wraps `data` written at `timestamp` with the given TTL.
    pub fn new(data: T, timestamp: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp,
            ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the write, clamped at zero.
    pub fn age_ms(&self, now: i64) -> u64 {
        u64::try_from(now.saturating_sub(self.timestamp)).unwrap_or(0)
    }

    // == Is Expired ==
    /// Checks whether the entry is logically absent at `now`.
    ///
    /// Strictly greater: an entry read exactly `ttl` milliseconds after it
    /// was written is still live.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.age_ms(now) > self.ttl
    }
}

//! Cache Engine Module
//!
//! TTL expiration and size-bounded eviction over a [`StorageAdapter`].
//!
//! Every public operation is infallible from the caller's point of view: a
//! read either hits or misses, a write either lands or is silently dropped.
//! The network stays the source of truth, so cache trouble must never break
//! a fetch. Failure reasons are still surfaced internally through
//! [`CacheEngine::lookup`] and [`CacheEngine::try_set`] and logged.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::entry::{CacheEntry, EntryMeta};
use crate::cache::index::CacheIndex;
use crate::cache::key::{display_key, is_entry_key, CACHE_INDEX_KEY};
use crate::cache::partition::UserDataPolicy;
use crate::cache::size::estimate_size;
use crate::cache::stats::{
    CacheItemStats, CacheStats, ClearReport, ClearableStats, EvictionReport, SweepReport,
};
use crate::cache::ttl::{TtlCategory, TtlConfig};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheLimits, Config};
use crate::error::{CacheError, Result, StorageError};
use crate::storage::{FileStorage, MemoryStorage, StorageAdapter};

/// Engine shared between tasks. The mutex is the single writer for the index.
pub type SharedEngine = Arc<Mutex<CacheEngine>>;

/// Runs `op` on the shared engine from the blocking thread pool.
///
/// Engine calls may write the storage file synchronously, so async callers
/// go through here instead of locking on an executor thread.
pub async fn run_locked<R, F>(engine: &SharedEngine, op: F) -> Result<R>
where
    F: FnOnce(&mut CacheEngine) -> R + Send + 'static,
    R: Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || op(&mut engine.blocking_lock()))
        .await
        .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))
}

// == Lookup ==
/// Outcome of a read that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Live entry found
    Hit(T),
    /// Nothing stored under the key
    Miss,
    /// Entry was past its TTL and has been removed
    Expired,
}

impl<T> Lookup<T> {
    /// Collapses to the value, if any.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

/// Entry considered by a forced eviction pass.
struct Candidate {
    key: String,
    timestamp: i64,
    size: u64,
}

// == Cache Engine ==
/// Persistent key/value cache with per-entry TTL and a byte budget.
pub struct CacheEngine {
    /// Backing medium, shared with the client's other local state
    storage: Box<dyn StorageAdapter>,
    /// Time source for write stamps and expiry checks
    clock: Arc<dyn Clock>,
    /// Hard cap and eviction target
    limits: CacheLimits,
    /// Lifetimes per data category
    ttl: TtlConfig,
    /// Key partitions for the bulk clear
    policy: UserDataPolicy,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine over `storage` using the system clock.
    pub fn new(storage: impl StorageAdapter + 'static, limits: CacheLimits) -> Self {
        Self::with_clock(storage, limits, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit time source.
    pub fn with_clock(
        storage: impl StorageAdapter + 'static,
        limits: CacheLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage: Box::new(storage),
            clock,
            limits,
            ttl: TtlConfig::default(),
            policy: UserDataPolicy::default(),
        }
    }

    /// Opens the configured medium and builds an engine over it.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let engine = match &config.storage_path {
            Some(path) => Self::new(FileStorage::open(path, config.storage_quota)?, config.limits),
            None => {
                let storage = match config.storage_quota {
                    Some(quota) => MemoryStorage::with_quota(quota),
                    None => MemoryStorage::new(),
                };
                Self::new(storage, config.limits)
            }
        };
        Ok(engine.with_ttl_config(config.ttl.clone()))
    }

    pub fn with_ttl_config(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    /// Wraps the engine for use across tasks.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn limits(&self) -> CacheLimits {
        self.limits
    }

    /// Lifetime configured for a data category.
    pub fn ttl_for(&self, category: TtlCategory) -> Duration {
        self.ttl.ttl(category)
    }

    /// The underlying medium.
    pub fn storage(&self) -> &dyn StorageAdapter {
        &*self.storage
    }

    /// Mutable access to the underlying medium, for the client's non-cache
    /// state that lives beside the cache.
    pub fn storage_mut(&mut self) -> &mut dyn StorageAdapter {
        &mut *self.storage
    }

    /// Current persisted index.
    pub fn index(&self) -> CacheIndex {
        CacheIndex::load(&*self.storage, self.clock.now_ms())
    }

    // == Get ==
    /// Returns the live value stored under `key`, or None.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        match self.lookup(key) {
            Ok(Lookup::Hit(value)) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Ok(Lookup::Miss) => {
                debug!("Cache miss: {}", key);
                None
            }
            Ok(Lookup::Expired) => {
                debug!("Cache entry expired: {}", key);
                None
            }
            Err(e) => {
                warn!("Cache read error: {}", e);
                None
            }
        }
    }

    // == Lookup ==
    /// Reads `key`, reporting why a read produced nothing.
    ///
    /// Expired and unparsable entries are removed from the medium and the
    /// index before returning.
    pub fn lookup<T: DeserializeOwned>(&mut self, key: &str) -> Result<Lookup<T>> {
        if !is_entry_key(key) {
            return Err(CacheError::InvalidRequest(format!(
                "'{}' is not a cache key",
                key
            )));
        }

        let Some(raw) = self.storage.get(key) else {
            self.forget(key, 0);
            return Ok(Lookup::Miss);
        };
        let size = estimate_size(&raw);

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(source) => {
                self.discard(key, size);
                return Err(CacheError::Corrupted {
                    key: key.to_string(),
                    source,
                });
            }
        };

        if entry.is_expired_at(self.clock.now_ms()) {
            self.discard(key, size);
            return Ok(Lookup::Expired);
        }

        Ok(Lookup::Hit(entry.data))
    }

    // == Set ==
    /// Caches `value` under `key` for `ttl`.
    ///
    /// Never fails: if the value cannot be stored it simply will not be
    /// cached this time.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.try_set(key, value, ttl) {
            warn!("Cache write for '{}' abandoned: {}", key, e);
        }
    }

    /// Caches `value` with the lifetime configured for `category`.
    pub fn set_in<T: Serialize + ?Sized>(&mut self, category: TtlCategory, key: &str, value: &T) {
        let ttl = self.ttl_for(category);
        self.set(key, value, ttl);
    }

    /// Write path with the failure reason preserved.
    ///
    /// Runs a forced eviction before writing when the index total would pass
    /// the hard cap, and once more (followed by a single retry) when the
    /// medium itself rejects the write for lack of space.
    pub fn try_set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        if !is_entry_key(key) {
            return Err(CacheError::InvalidRequest(format!(
                "'{}' is not a cache key",
                key
            )));
        }

        let now = self.clock.now_ms();
        let serialized = serde_json::to_string(&CacheEntry::new(value, now, ttl))?;
        let new_size = estimate_size(&serialized);

        let index = CacheIndex::load(&*self.storage, now);
        let old_size = self.stored_size(key);

        if index.total_size.saturating_sub(old_size) + new_size > self.limits.max_size {
            debug!(
                "Write of {} bytes to '{}' would pass the cache cap, evicting first",
                new_size, key
            );
            self.force_evict(new_size);
        }

        match self.write_entry(key, &serialized, new_size) {
            Err(CacheError::Storage(e)) if e.is_quota_exceeded() => {
                warn!("Cache write error, attempting cleanup: {}", e);
                self.force_evict(new_size);
                self.write_entry(key, &serialized, new_size)
            }
            other => other,
        }
    }

    /// Stores the serialized entry and accounts for it in the index, as one
    /// storage batch.
    fn write_entry(&mut self, key: &str, serialized: &str, new_size: u64) -> Result<()> {
        let (stored, committed) = self.batched(|engine: &mut Self| -> Result<()> {
            let old_size = engine.stored_size(key);
            engine.storage.set(key, serialized)?;

            // Eviction may have rewritten the index, so start from the stored copy
            let mut index = CacheIndex::load(&*engine.storage, engine.clock.now_ms());
            if index.insert(key) {
                index.total_size += new_size;
            } else {
                index.total_size = index.total_size.saturating_sub(old_size) + new_size;
            }
            index.save(&mut *engine.storage);
            Ok(())
        });
        stored?;
        committed?;
        Ok(())
    }

    // == Remove ==
    /// Deletes the entry under `key`.
    pub fn remove(&mut self, key: &str) {
        if !is_entry_key(key) {
            debug!("Ignoring removal of non-cache key '{}'", key);
            return;
        }

        let size = self.stored_size(key);
        self.discard(key, size);
    }

    // == Clear All ==
    /// Deletes every indexed entry and resets the index.
    ///
    /// Keeps going past individual deletion failures.
    pub fn clear_all(&mut self) {
        self.maintenance("clear", Self::clear_pass);
    }

    fn clear_pass(&mut self) {
        let now = self.clock.now_ms();
        let index = CacheIndex::load(&*self.storage, now);

        let removed = index
            .keys
            .iter()
            .filter(|key| self.delete_entry(key))
            .count();

        CacheIndex::empty(now).save(&mut *self.storage);
        info!("Cache cleared: removed {} of {} entries", removed, index.len());
    }

    // == Stats ==
    /// Walks the index and reports every stored entry.
    ///
    /// Unparsable entries are removed along the way; keys with nothing
    /// stored behind them are dropped from the index. Expired entries are
    /// reported, not removed.
    pub fn stats(&mut self) -> CacheStats {
        let (stats, committed) = self.batched(Self::stats_pass);
        if let Err(e) = committed {
            warn!("Cache stats cleanup not persisted: {}", e);
        }
        stats
    }

    fn stats_pass(&mut self) -> CacheStats {
        let now = self.clock.now_ms();
        let mut index = CacheIndex::load(&*self.storage, now);
        let mut items = Vec::with_capacity(index.len());
        let mut healed = false;

        for key in index.keys.clone() {
            let Some(raw) = self.storage.get(&key) else {
                index.remove(&key);
                healed = true;
                continue;
            };
            let size = estimate_size(&raw);

            match serde_json::from_str::<EntryMeta>(&raw) {
                Ok(meta) => items.push(CacheItemStats {
                    key: display_key(&key),
                    size,
                    age_ms: meta.age_ms(now),
                    ttl_ms: meta.ttl,
                    expired: meta.is_expired_at(now),
                }),
                Err(e) => {
                    warn!("Removing corrupted cache entry '{}': {}", key, e);
                    if self.delete_entry(&key) {
                        index.remove(&key);
                        index.total_size = index.total_size.saturating_sub(size);
                        healed = true;
                    }
                }
            }
        }

        if healed {
            index.save(&mut *self.storage);
        }

        let index_size = self.stored_size(CACHE_INDEX_KEY);
        CacheStats::from_items(items, index_size, self.storage.used_bytes())
    }

    // == Cleanup Expired ==
    /// Removes every expired or unparsable entry and reconciles the index.
    pub fn cleanup_expired(&mut self) -> SweepReport {
        self.maintenance("sweep", Self::sweep_pass)
    }

    fn sweep_pass(&mut self) -> SweepReport {
        let now = self.clock.now_ms();
        let index = CacheIndex::load(&*self.storage, now);
        let mut reconciled = CacheIndex::empty(now);
        let mut report = SweepReport::default();

        for key in &index.keys {
            let Some(raw) = self.storage.get(key) else {
                report.missing += 1;
                continue;
            };
            let size = estimate_size(&raw);

            let removable = match serde_json::from_str::<EntryMeta>(&raw) {
                Ok(meta) if meta.is_expired_at(now) => {
                    report.expired += 1;
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    warn!("Removing corrupted cache entry '{}': {}", key, e);
                    report.corrupted += 1;
                    true
                }
            };

            // A failed delete stays indexed so the next pass retries it
            if !removable || !self.delete_entry(key) {
                reconciled.insert(key);
                reconciled.total_size += size;
            }
        }

        report.live = reconciled.len();
        report.total_size = reconciled.total_size;
        reconciled.save(&mut *self.storage);

        if report.removed() > 0 {
            info!(
                "Cache sweep: removed {} expired, {} corrupted, {} missing; {} live ({} bytes)",
                report.expired, report.corrupted, report.missing, report.live, report.total_size
            );
        } else {
            debug!("Cache sweep: nothing to remove");
        }
        report
    }

    // == Force Evict ==
    /// Evicts the oldest entries until the live total plus `reserve` bytes
    /// is at or below the soft threshold.
    ///
    /// The running total is recomputed from the stored entries, so this also
    /// corrects any drift in the index.
    pub fn force_evict(&mut self, reserve: u64) -> EvictionReport {
        self.maintenance("eviction", |engine| engine.evict_pass(reserve))
    }

    fn evict_pass(&mut self, reserve: u64) -> EvictionReport {
        let now = self.clock.now_ms();
        let index = CacheIndex::load(&*self.storage, now);
        let mut report = EvictionReport::default();
        let mut candidates = Vec::with_capacity(index.len());

        for key in &index.keys {
            let Some(raw) = self.storage.get(key) else {
                continue;
            };

            match serde_json::from_str::<EntryMeta>(&raw) {
                Ok(meta) => candidates.push(Candidate {
                    key: key.clone(),
                    timestamp: meta.timestamp,
                    size: estimate_size(&raw),
                }),
                Err(e) => {
                    warn!("Removing corrupted cache entry '{}': {}", key, e);
                    self.delete_entry(key);
                    report.corrupted += 1;
                }
            }
        }

        // Oldest write first; order among equal timestamps is unspecified
        candidates.sort_by_key(|c| c.timestamp);

        let mut running: u64 = candidates.iter().map(|c| c.size).sum();
        let mut remaining = CacheIndex::empty(now);

        for candidate in candidates {
            if running + reserve > self.limits.soft_threshold && self.delete_entry(&candidate.key)
            {
                running -= candidate.size;
                report.evicted += 1;
                report.freed_bytes += candidate.size;
            } else {
                remaining.insert(&candidate.key);
            }
        }

        remaining.total_size = running;
        remaining.save(&mut *self.storage);
        report.remaining_bytes = running;

        info!(
            "Forced eviction: removed {} entries ({} bytes), {} corrupted, {} bytes remain",
            report.evicted, report.freed_bytes, report.corrupted, report.remaining_bytes
        );
        report
    }

    // == Clear User Data ==
    /// The user-facing "clear cache" action.
    ///
    /// Removes every cache entry plus the ephemeral client state named by
    /// the policy. Retained user data is left untouched. Cache entries the
    /// index lost track of are removed too.
    pub fn clear_user_data(&mut self) -> ClearReport {
        self.maintenance("user-data clear", Self::clear_user_data_pass)
    }

    fn clear_user_data_pass(&mut self) -> ClearReport {
        let stats = self.stats_pass();
        let indexed = self.index().keys;
        let mut report = ClearReport {
            cleared_count: stats.count,
            total_size: stats.total_size,
        };
        self.clear_pass();

        for key in self.storage.keys() {
            if !self.policy.is_clearable(&key) || indexed.contains(&key) {
                continue;
            }
            let size = self.stored_size(&key);
            match self.storage.remove(&key) {
                Ok(()) => {
                    report.cleared_count += 1;
                    report.total_size += size;
                }
                Err(e) => warn!("Failed to clear '{}': {}", key, e),
            }
        }

        info!(
            "User data cleared: {} items, {} bytes",
            report.cleared_count, report.total_size
        );
        report
    }

    /// What [`clear_user_data`](Self::clear_user_data) would remove.
    pub fn clearable_data_stats(&mut self) -> ClearableStats {
        let stats = self.stats();
        let indexed = self.index().keys;
        let mut clearable = ClearableStats {
            count: stats.count,
            size: stats.total_size,
        };

        for key in self.storage.keys() {
            if self.policy.is_clearable(&key) && !indexed.contains(&key) {
                clearable.count += 1;
                clearable.size += self.stored_size(&key);
            }
        }
        clearable
    }

    // == Batches ==
    /// Runs `pass` as one storage batch, so the medium persists once at
    /// the end. Returns the pass result and the outcome of that persist.
    fn batched<R>(
        &mut self,
        pass: impl FnOnce(&mut Self) -> R,
    ) -> (R, std::result::Result<(), StorageError>) {
        self.storage.begin_batch();
        let out = pass(self);
        let committed = self.storage.commit_batch();
        (out, committed)
    }

    /// Runs a maintenance pass as one batch. A pass that could not be
    /// persisted was rolled back by the medium and reports nothing done.
    fn maintenance<R: Default>(&mut self, name: &str, pass: impl FnOnce(&mut Self) -> R) -> R {
        match self.batched(pass) {
            (out, Ok(())) => out,
            (_, Err(e)) => {
                warn!("Cache {} not persisted, rolled back: {}", name, e);
                R::default()
            }
        }
    }

    // == Helpers ==
    /// Physically deletes `key`, logging failures.
    fn delete_entry(&mut self, key: &str) -> bool {
        match self.storage.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to delete cache entry '{}': {}", key, e);
                false
            }
        }
    }

    /// Drops `key` from the index, subtracting `size` from the total.
    fn forget(&mut self, key: &str, size: u64) {
        let mut index = CacheIndex::load(&*self.storage, self.clock.now_ms());
        if index.remove(key) {
            index.total_size = index.total_size.saturating_sub(size);
            index.save(&mut *self.storage);
        }
    }

    /// Removes a dead entry from both the medium and the index.
    fn discard(&mut self, key: &str, size: u64) {
        let ((), committed) = self.batched(|engine| {
            if engine.delete_entry(key) {
                engine.forget(key, size);
            }
        });
        if let Err(e) = committed {
            warn!("Removal of '{}' not persisted: {}", key, e);
        }
    }

    fn stored_size(&self, key: &str) -> u64 {
        self.storage
            .get(key)
            .map(|raw| estimate_size(&raw))
            .unwrap_or(0)
    }
}

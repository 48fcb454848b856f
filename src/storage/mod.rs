//! Storage Module
//!
//! The synchronous, capacity-limited key/value medium the cache sits on.
//! Capacity is never announced up front; a write either lands or fails with
//! [`StorageError::QuotaExceeded`].

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

// == Storage Adapter ==
/// A synchronous key/value medium with string keys and string payloads.
pub trait StorageAdapter: Send {
    /// Returns the raw stored payload for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous payload.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Lists every stored key, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Bytes currently charged against the medium's quota.
    fn used_bytes(&self) -> u64;

    /// Starts deferring persistence until the matching [`commit_batch`].
    ///
    /// Batches nest; only the outermost commit persists. Mediums without a
    /// separate persistence step ignore this.
    ///
    /// [`commit_batch`]: StorageAdapter::commit_batch
    fn begin_batch(&mut self) {}

    /// Persists every change made since the outermost [`begin_batch`].
    ///
    /// On failure the medium rolls back to its state at `begin_batch`.
    ///
    /// [`begin_batch`]: StorageAdapter::begin_batch
    fn commit_batch(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

//! In-memory storage medium with an optional byte quota.

use std::collections::HashMap;

use crate::error::StorageError;
use crate::storage::StorageAdapter;

// == Memory Storage ==
/// HashMap-backed medium.
///
/// Each item is charged `key.len() + value.len()` bytes against the quota,
/// which is how browser local storage accounts for space.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    /// Stored payloads
    items: HashMap<String, String>,
    /// Maximum chargeable bytes, None = unbounded
    quota: Option<u64>,
    /// Bytes currently charged
    used: u64,
}

impl MemoryStorage {
    // == Constructors ==
    /// Creates an unbounded medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a medium that rejects writes beyond `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Builds a medium from existing items, charging them against `quota`.
    ///
    /// Items loaded this way may already exceed the quota; later writes
    /// will simply fail until space is freed.
    pub fn from_items(items: HashMap<String, String>, quota: Option<u64>) -> Self {
        let used = items.iter().map(|(k, v)| charge(k, v)).sum();
        Self { items, quota, used }
    }

    /// Read access to the raw items, used when persisting.
    pub fn items(&self) -> &HashMap<String, String> {
        &self.items
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let old = self.items.get(key).map(|v| charge(key, v)).unwrap_or(0);
        let new = charge(key, value);
        let used_without = self.used.saturating_sub(old);

        if let Some(quota) = self.quota {
            if used_without + new > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    requested: new,
                    available: quota.saturating_sub(used_without),
                });
            }
        }

        self.items.insert(key.to_string(), value.to_string());
        self.used = used_without + new;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if let Some(old) = self.items.remove(key) {
            self.used = self.used.saturating_sub(charge(key, &old));
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn used_bytes(&self) -> u64 {
        self.used
    }
}

fn charge(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

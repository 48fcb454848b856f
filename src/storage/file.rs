//! File-backed storage medium.
//!
//! Keeps the whole medium in memory and writes it through to a single JSON
//! file. Writes go to a sibling temp file first and are renamed into place,
//! so a crash mid-write leaves the previous snapshot. Inside a batch the
//! file is written once, at the outermost commit.

use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StorageError;
use crate::storage::{MemoryStorage, StorageAdapter};

// == File Storage ==
/// JSON-file persisted medium sharing [`MemoryStorage`]'s quota accounting.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    inner: MemoryStorage,
    /// Open batch nesting depth, 0 = write-through
    depth: usize,
    /// Value of each key touched in the open batch before its first change
    undo: HashMap<String, Option<String>>,
}

impl FileStorage {
    // == Open ==
    /// Opens (or creates) the medium at `path`.
    ///
    /// A missing file starts empty. A file that is not a JSON string map is
    /// logged and replaced by an empty medium on the next write; any other
    /// I/O failure is returned.
    pub fn open(path: impl AsRef<Path>, quota: Option<u64>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let items = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Storage file {} is unreadable, starting empty: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        info!(
            "Storage opened at {} with {} items",
            path.display(),
            items.len()
        );

        Ok(Self {
            path,
            inner: MemoryStorage::from_items(items, quota),
            depth: 0,
            undo: HashMap::new(),
        })
    }

    // == Flush ==
    /// Writes the full medium to disk. `key` names the write in errors.
    fn flush(&self, key: &str) -> Result<(), StorageError> {
        let raw = serde_json::to_string(self.inner.items())?;
        let requested = raw.len() as u64;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|e| write_error(key, requested, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_error(key, requested, e))?;
        Ok(())
    }

    /// Puts `key` back to `previous` after a failed flush.
    fn restore(&mut self, key: &str, previous: Option<String>) {
        let restored = match previous {
            Some(value) => self.inner.set(key, &value),
            None => self.inner.remove(key),
        };
        if let Err(e) = restored {
            warn!("Failed to roll back '{}' after flush error: {}", key, e);
        }
    }

    /// Records the pre-batch value of `key` and reports whether the write
    /// is deferred.
    fn defer(&mut self, key: &str, previous: &Option<String>) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.undo
            .entry(key.to_string())
            .or_insert_with(|| previous.clone());
        true
    }
}

/// A full disk is a capacity failure, same as a quota rejection.
fn write_error(key: &str, requested: u64, e: io::Error) -> StorageError {
    if e.kind() == ErrorKind::StorageFull {
        StorageError::QuotaExceeded {
            key: key.to_string(),
            requested,
            available: 0,
        }
    } else {
        StorageError::Io(e)
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self.inner.get(key);
        self.inner.set(key, value)?;

        if self.defer(key, &previous) {
            return Ok(());
        }
        if let Err(e) = self.flush(key) {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let previous = self.inner.get(key);
        if previous.is_none() {
            return Ok(());
        }
        self.inner.remove(key)?;

        if self.defer(key, &previous) {
            return Ok(());
        }
        if let Err(e) = self.flush(key) {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn used_bytes(&self) -> u64 {
        self.inner.used_bytes()
    }

    fn begin_batch(&mut self) {
        self.depth += 1;
    }

    fn commit_batch(&mut self) -> Result<(), StorageError> {
        match self.depth {
            0 => return Ok(()),
            1 => self.depth = 0,
            _ => {
                self.depth -= 1;
                return Ok(());
            }
        }

        let undo = std::mem::take(&mut self.undo);
        if undo.is_empty() {
            return Ok(());
        }

        let label = self.path.display().to_string();
        if let Err(e) = self.flush(&label) {
            // Free space first so restoring larger old values fits the quota
            let (removals, resets): (Vec<_>, Vec<_>) =
                undo.into_iter().partition(|(_, previous)| previous.is_none());
            for (key, previous) in removals.into_iter().chain(resets) {
                self.restore(&key, previous);
            }
            return Err(e);
        }
        Ok(())
    }
}

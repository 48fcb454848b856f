//! User-Data Partition Policy
//!
//! The cache shares its storage medium with the rest of the client's local
//! state. The "clear cache" action must know which of those keys are
//! disposable and which belong to the user.

use crate::cache::key::{CACHE_INDEX_KEY, CACHE_PREFIX};

/// Per-session client state that is safe to drop with the cache.
pub const EPHEMERAL_KEYS: [&str; 5] = [
    "inspire-volume",
    "inspire-queue",
    "inspire-queue-index",
    "inspire-progress",
    "search-history",
];

/// User data that a cache clear must never touch.
pub const RETAINED_KEYS: [&str; 3] = ["inspire-favorites", "inspire-playlists", "inspire-quality"];

// == Key Class ==
/// Which partition a storage key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Cache entries and the cache index
    Cache,
    /// Favorites, saved playlists, quality preference
    Retained,
    /// Queue, positions, search history
    Ephemeral,
    /// Not known to the policy; left alone
    Other,
}

// == User Data Policy ==
/// Classifies storage keys for the bulk clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataPolicy {
    ephemeral: Vec<String>,
    retained: Vec<String>,
}

impl UserDataPolicy {
    /// Builds a policy from explicit key lists.
    ///
    /// A key listed in both is treated as retained.
    pub fn new(ephemeral: Vec<String>, retained: Vec<String>) -> Self {
        let ephemeral = ephemeral
            .into_iter()
            .filter(|k| !retained.contains(k))
            .collect();
        Self {
            ephemeral,
            retained,
        }
    }

    pub fn classify(&self, key: &str) -> KeyClass {
        if key.starts_with(CACHE_PREFIX) || key == CACHE_INDEX_KEY {
            KeyClass::Cache
        } else if self.retained.iter().any(|k| k == key) {
            KeyClass::Retained
        } else if self.ephemeral.iter().any(|k| k == key) {
            KeyClass::Ephemeral
        } else {
            KeyClass::Other
        }
    }

    /// True for keys the bulk clear removes: cache entries (never the index
    /// record itself) and ephemeral client state.
    pub fn is_clearable(&self, key: &str) -> bool {
        match self.classify(key) {
            KeyClass::Cache => key != CACHE_INDEX_KEY,
            KeyClass::Ephemeral => true,
            KeyClass::Retained | KeyClass::Other => false,
        }
    }
}

impl Default for UserDataPolicy {
    fn default() -> Self {
        Self::new(
            EPHEMERAL_KEYS.iter().map(|k| k.to_string()).collect(),
            RETAINED_KEYS.iter().map(|k| k.to_string()).collect(),
        )
    }
}

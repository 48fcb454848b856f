//! TTL Categories
//!
//! Each kind of fetched data is cached with its own lifetime: lyrics almost
//! never change, search results go stale quickly.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

// == TTL Category ==
/// Categories of cached data recognized by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlCategory {
    /// Chart listings
    Toplists,
    /// Songs of a single chart
    ToplistSongs,
    /// Lyric text
    Lyrics,
    /// Song details
    SongInfo,
    /// Remote playlist contents
    Playlist,
    /// Search results
    Search,
}

impl TtlCategory {
    /// Every category, in declaration order.
    pub const ALL: [TtlCategory; 6] = [
        TtlCategory::Toplists,
        TtlCategory::ToplistSongs,
        TtlCategory::Lyrics,
        TtlCategory::SongInfo,
        TtlCategory::Playlist,
        TtlCategory::Search,
    ];

    /// Stable name, also used as the cache key type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TtlCategory::Toplists => "toplists",
            TtlCategory::ToplistSongs => "toplist_songs",
            TtlCategory::Lyrics => "lyrics",
            TtlCategory::SongInfo => "song_info",
            TtlCategory::Playlist => "playlist",
            TtlCategory::Search => "search",
        }
    }

    /// Built-in lifetime for the category.
    pub fn default_ttl(self) -> Duration {
        let secs = match self {
            TtlCategory::Toplists => 6 * HOUR,
            TtlCategory::ToplistSongs => HOUR,
            TtlCategory::Lyrics => 7 * DAY,
            TtlCategory::SongInfo => DAY,
            TtlCategory::Playlist => HOUR,
            TtlCategory::Search => 10 * MINUTE,
        };
        Duration::from_secs(secs)
    }

    /// Environment variable that overrides the lifetime, in seconds.
    pub fn env_var(self) -> String {
        format!("TTL_{}_SECS", self.as_str().to_uppercase())
    }
}

// == TTL Config ==
/// Lifetimes per category, defaulting to [`TtlCategory::default_ttl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlConfig {
    ttls: HashMap<TtlCategory, Duration>,
}

impl TtlConfig {
    /// Lifetime configured for `category`.
    pub fn ttl(&self, category: TtlCategory) -> Duration {
        self.ttls
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_ttl())
    }

    /// Replaces the lifetime for `category`.
    pub fn with_ttl(mut self, category: TtlCategory, ttl: Duration) -> Self {
        self.ttls.insert(category, ttl);
        self
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            ttls: TtlCategory::ALL
                .iter()
                .map(|c| (*c, c.default_ttl()))
                .collect(),
        }
    }
}

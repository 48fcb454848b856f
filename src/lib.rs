//! Inspire Cache - local persistent metadata cache
//!
//! Caches remote music metadata (charts, lyrics, song info, playlists,
//! search results) in a key/value storage medium shared with the client's
//! other local state, with per-entry TTL expiration and oldest-first
//! eviction under a byte budget.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, SharedEngine};
pub use config::Config;
pub use tasks::initialize;

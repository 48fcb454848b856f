//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{TtlCategory, TtlConfig};
use crate::error::{CacheError, Result};

const MIB: u64 = 1024 * 1024;

// == Cache Limits ==
/// Capacity policy: forced eviction starts above `max_size` and evicts down
/// to `soft_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Hard cap on the estimated cache size in bytes
    pub max_size: u64,
    /// Eviction target in bytes, strictly below `max_size`
    pub soft_threshold: u64,
}

impl CacheLimits {
    /// Checks that the hysteresis band is not empty.
    pub fn validate(&self) -> Result<()> {
        if self.soft_threshold >= self.max_size {
            return Err(CacheError::Config(format!(
                "cleanup threshold ({}) must be below max cache size ({})",
                self.soft_threshold, self.max_size
            )));
        }
        Ok(())
    }
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_size: 5 * MIB,
            soft_threshold: 4 * MIB,
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// JSON file backing the storage medium, None = in-memory only
    pub storage_path: Option<PathBuf>,
    /// Byte quota of the storage medium, None = unbounded
    pub storage_quota: Option<u64>,
    /// Cache capacity policy
    pub limits: CacheLimits,
    /// Delay before the startup expiration sweep in milliseconds
    pub sweep_delay_ms: u64,
    /// Interval between periodic sweeps in seconds, 0 = startup sweep only
    pub sweep_interval_secs: u64,
    /// Lifetimes per data category
    pub ttl: TtlConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STORAGE_PATH` - Storage file path (default: unset, in-memory)
    /// - `STORAGE_QUOTA` - Storage quota in bytes, 0 = unbounded (default: 10 MiB)
    /// - `MAX_CACHE_SIZE` - Hard cap in bytes (default: 5 MiB)
    /// - `CLEANUP_THRESHOLD` - Eviction target in bytes (default: 4 MiB)
    /// - `SWEEP_DELAY_MS` - Startup sweep delay (default: 5000)
    /// - `SWEEP_INTERVAL_SECS` - Periodic sweep interval (default: 0)
    /// - `TTL_<CATEGORY>_SECS` - Per-category lifetime, e.g. `TTL_LYRICS_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_quota = match env_or("STORAGE_QUOTA", defaults.storage_quota.unwrap_or(0)) {
            0 => None,
            quota => Some(quota),
        };

        let ttl = TtlCategory::ALL.iter().fold(defaults.ttl, |ttl, category| {
            match env::var(category.env_var()).ok().and_then(|v| v.parse().ok()) {
                Some(secs) => ttl.with_ttl(*category, Duration::from_secs(secs)),
                None => ttl,
            }
        });

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            storage_path: env::var("STORAGE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            storage_quota,
            limits: CacheLimits {
                max_size: env_or("MAX_CACHE_SIZE", defaults.limits.max_size),
                soft_threshold: env_or("CLEANUP_THRESHOLD", defaults.limits.soft_threshold),
            },
            sweep_delay_ms: env_or("SWEEP_DELAY_MS", defaults.sweep_delay_ms),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            ttl,
        }
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()
    }

    pub fn sweep_delay(&self) -> Duration {
        Duration::from_millis(self.sweep_delay_ms)
    }

    /// Periodic sweep interval, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            storage_path: None,
            storage_quota: Some(10 * MIB),
            limits: CacheLimits::default(),
            sweep_delay_ms: 5000,
            sweep_interval_secs: 0,
            ttl: TtlConfig::default(),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

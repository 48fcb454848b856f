//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{make_key, TtlCategory};

/// Request body for the store operation (PUT /cache)
///
/// # Fields
/// - `key`: A full cache key, as returned by `POST /keys`
/// - `value`: Any JSON value
/// - `ttl_ms`: Explicit lifetime in milliseconds
/// - `category`: Data category whose configured lifetime applies when
///   `ttl_ms` is absent
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: serde_json::Value,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Optional data category
    #[serde(default)]
    pub category: Option<TtlCategory>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.ttl_ms.is_none() && self.category.is_none() {
            return Some("Either ttl_ms or category is required".to_string());
        }
        if self.ttl_ms == Some(0) {
            return Some("ttl_ms must be positive".to_string());
        }
        None
    }

    /// The explicit lifetime, if one was given.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

// == Key Request ==
/// Request body for key construction (POST /keys)
#[derive(Debug, Clone, Deserialize)]
pub struct KeyRequest {
    /// Data type tag, e.g. `lyrics`
    pub kind: String,
    /// Ordered identifying arguments
    #[serde(default)]
    pub args: Vec<KeyArg>,
}

impl KeyRequest {
    pub fn validate(&self) -> Option<String> {
        if self.kind.is_empty() {
            return Some("Kind cannot be empty".to_string());
        }
        None
    }

    /// Builds the cache key for this identity.
    pub fn to_key(&self) -> String {
        let args: Vec<&dyn fmt::Display> =
            self.args.iter().map(|a| a as &dyn fmt::Display).collect();
        make_key(&self.kind, &args)
    }
}

/// A single key argument: a JSON string or number.
///
/// Numbers render without quotes, so `1` and `"1"` produce the same key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyArg {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for KeyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyArg::Text(s) => f.write_str(s),
            KeyArg::Number(n) => write!(f, "{}", n),
        }
    }
}

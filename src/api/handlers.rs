//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use std::time::Duration;

use crate::cache::{
    is_entry_key, run_locked, CacheEngine, CacheStats, ClearReport, ClearableStats,
    EvictionReport, Lookup, SharedEngine, SweepReport,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, KeyRequest, KeyResponse,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
///
/// Holds the engine behind a single mutex, so every index update is
/// serialized. Handlers reach it through [`run_locked`].
#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
}

impl AppState {
    /// Creates a new AppState around the given engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self {
            engine: engine.into_shared(),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the configured storage medium; fails if the file cannot be
    /// read or the capacity settings are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheEngine::from_config(config)?))
    }
}

/// Handler for PUT /cache
///
/// Stores a JSON value. An explicit `ttl_ms` wins over `category`.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let explicit = req.ttl();
    let SetRequest {
        key,
        value,
        category,
        ..
    } = req;

    let (key, ttl) = run_locked(&state.engine, move |engine| -> Result<(String, Duration)> {
        let ttl = match (explicit, category) {
            (Some(ttl), _) => ttl,
            (None, Some(category)) => engine.ttl_for(category),
            (None, None) => {
                return Err(CacheError::InvalidRequest(
                    "Either ttl_ms or category is required".to_string(),
                ))
            }
        };
        engine.try_set(&key, &value, ttl)?;
        Ok((key, ttl))
    })
    .await??;

    Ok(Json(SetResponse::new(key, ttl.as_millis() as u64)))
}

/// Handler for GET /cache/:key
///
/// Expired and unreadable entries answer 404 like absent ones.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup_key = key.clone();
    let lookup = run_locked(&state.engine, move |engine| {
        engine.lookup::<Value>(&lookup_key)
    })
    .await?;

    match lookup {
        Ok(Lookup::Hit(value)) => Ok(Json(GetResponse::new(key, value))),
        Ok(Lookup::Miss) | Ok(Lookup::Expired) | Err(CacheError::Corrupted { .. }) => {
            Err(CacheError::NotFound(key))
        }
        Err(e) => Err(e),
    }
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !is_entry_key(&key) {
        return Err(CacheError::InvalidRequest(format!(
            "'{}' is not a cache key",
            key
        )));
    }

    let removed = key.clone();
    run_locked(&state.engine, move |engine| engine.remove(&removed)).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    run_locked(&state.engine, CacheEngine::clear_all).await?;
    Ok(Json(ClearResponse::new()))
}

/// Handler for POST /keys
///
/// Builds the canonical key for a data type and its arguments.
pub async fn key_handler(Json(req): Json<KeyRequest>) -> Result<Json<KeyResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    Ok(Json(KeyResponse { key: req.to_key() }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStats>> {
    Ok(Json(run_locked(&state.engine, CacheEngine::stats).await?))
}

/// Handler for POST /maintenance/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    Ok(Json(
        run_locked(&state.engine, CacheEngine::cleanup_expired).await?,
    ))
}

/// Handler for POST /maintenance/evict
///
/// Evicts oldest entries down to the soft threshold.
pub async fn evict_handler(State(state): State<AppState>) -> Result<Json<EvictionReport>> {
    Ok(Json(
        run_locked(&state.engine, |engine| engine.force_evict(0)).await?,
    ))
}

/// Handler for GET /user-data/clearable
pub async fn clearable_handler(State(state): State<AppState>) -> Result<Json<ClearableStats>> {
    Ok(Json(
        run_locked(&state.engine, CacheEngine::clearable_data_stats).await?,
    ))
}

/// Handler for POST /user-data/clear
pub async fn clear_user_data_handler(State(state): State<AppState>) -> Result<Json<ClearReport>> {
    Ok(Json(
        run_locked(&state.engine, CacheEngine::clear_user_data).await?,
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

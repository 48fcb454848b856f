//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /cache`, `DELETE /cache` - Store a value, clear the cache
//! - `GET /cache/:key`, `DELETE /cache/:key` - Read or remove one entry
//! - `POST /keys` - Build a cache key
//! - `GET /stats` - Get cache statistics
//! - `POST /maintenance/sweep`, `POST /maintenance/evict` - Manual maintenance
//! - `GET /user-data/clearable`, `POST /user-data/clear` - User-data clear
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

//! Background Tasks Module
//!
//! Contains the maintenance work that runs beside the cache.
//!
//! # Tasks
//! - Expiration sweep: removes expired entries after a startup delay, then
//!   optionally on an interval

mod cleanup;

pub use cleanup::initialize;

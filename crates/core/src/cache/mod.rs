//! SQLite-backed cache storage for the offline engine.
//!
//! This module provides the persistent state shared by every worker version,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named, versioned cache generations with activation-time eviction
//! - Request-keyed response snapshots (SHA-256 of method + URL)
//! - The deferred-write queue drained by background sync
//! - Maintenance purges (LRU per generation, by domain)

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod queue;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedKey, GenerationStats};
pub use generations::{CacheGeneration, CacheNames, GenerationId, Role};
pub use queue::{NewWrite, QueuedWrite, STORAGE_KEY_PREFIX};

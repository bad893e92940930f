//! Core of the swkit offline caching engine.
//!
//! This crate provides:
//! - Versioned cache generations with a SQLite backend
//! - Request routing and the three retrieval strategies
//! - The worker lifecycle and host registration
//! - A persisted deferred-write queue drained on reconnect
//! - Push notification handling
//!
//! Network access and notification display are supplied by the host through
//! the [`Network`] and [`NotificationHost`] traits.

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod lifecycle;
pub mod network;
pub mod push;
pub mod request;
pub mod router;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::CacheDb;
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use lifecycle::{Registration, WorkerState};
pub use network::Network;
pub use push::{ClickOutcome, Notification, NotificationHost};
pub use request::{Destination, Request, RequestKey, Response};
pub use strategy::{Served, Source};
pub use sync::{DrainReport, SubmitOutcome};
pub use worker::{OfflineWorker, WorkerStatus};

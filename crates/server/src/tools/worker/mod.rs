//! Worker lifecycle and event tools.

pub mod fetch;
pub mod install;
pub mod status;
pub mod sync;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use install::{WorkerInstallParams, install_impl};
pub use status::status_impl;
pub use sync::{WorkerSyncParams, sync_impl};

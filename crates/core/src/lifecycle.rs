//! Worker lifecycle states and registration.
//!
//! ```text
//! Installing -> Installed -> Activating -> Active -> Superseded
//!      \            \             \          \           \
//!       `------------`-------------`----------`-----------`--> Redundant
//! ```
//!
//! A [`Registration`] owns at most one controlling worker. A newer worker only
//! takes over once it has installed and activated; until then the previous
//! controller keeps serving.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::worker::OfflineWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Active,
    /// Replaced by a newer worker version.
    Superseded,
    /// Failed to install or activate, or unregistered. Terminal.
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Installed, Superseded)
                | (Activating, Active)
                | (Active, Superseded)
                | (Installing | Installed | Activating | Active | Superseded, Redundant)
        )
    }
}

/// Host-side registration of the offline worker.
#[derive(Default)]
pub struct Registration {
    controller: RwLock<Option<Arc<OfflineWorker>>>,
    update_available: AtomicBool,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install and activate `worker`, then make it the controller.
    ///
    /// On failure the previous controller, if any, stays in place and the
    /// error is returned.
    pub async fn register(&self, worker: Arc<OfflineWorker>) -> Result<Arc<OfflineWorker>, Error> {
        if let Err(e) = worker.install().await {
            tracing::warn!(error = %e, "worker install failed; keeping current controller");
            return Err(e);
        }
        worker.activate().await?;

        let mut controller = self.controller.write().await;
        if let Some(previous) = controller.replace(Arc::clone(&worker)) {
            if let Err(e) = previous.supersede().await {
                tracing::warn!(error = %e, "previous worker could not be superseded");
            }
            self.update_available.store(true, Ordering::SeqCst);
            tracing::info!("new worker version took over");
        } else {
            tracing::info!("worker registered");
        }

        Ok(worker)
    }

    /// The worker currently controlling clients.
    pub async fn controller(&self) -> Option<Arc<OfflineWorker>> {
        self.controller.read().await.clone()
    }

    /// Whether a newer worker replaced a previous controller.
    pub fn update_available(&self) -> bool {
        self.update_available.load(Ordering::SeqCst)
    }

    /// Drop the controller; it becomes redundant. Returns false if none was registered.
    pub async fn unregister(&self) -> bool {
        let Some(worker) = self.controller.write().await.take() else {
            return false;
        };
        if let Err(e) = worker.retire().await {
            tracing::warn!(error = %e, "unregistered worker did not retire cleanly");
        }
        tracing::info!("worker unregistered");
        true
    }
}

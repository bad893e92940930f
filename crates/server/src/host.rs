//! Shared state behind every tool: configuration, storage, the network and
//! the worker registration.

use std::sync::Arc;

use swkit_core::{AppConfig, CacheDb, Error, Network, NotificationHost, OfflineWorker, Registration};

use crate::error::HostError;

pub struct WorkerHost {
    pub config: AppConfig,
    pub cache: CacheDb,
    pub network: Arc<dyn Network>,
    pub notifier: Arc<dyn NotificationHost>,
    pub registration: Registration,
}

impl WorkerHost {
    pub fn new(
        config: AppConfig,
        cache: CacheDb,
        network: Arc<dyn Network>,
        notifier: Arc<dyn NotificationHost>,
    ) -> Self {
        Self { config, cache, network, notifier, registration: Registration::new() }
    }

    /// Build a worker for `config` sharing this host's storage and network.
    pub fn build_worker(&self, config: AppConfig) -> Result<Arc<OfflineWorker>, Error> {
        let worker =
            OfflineWorker::new(config, self.cache.clone(), Arc::clone(&self.network), Arc::clone(&self.notifier))?;
        Ok(Arc::new(worker))
    }

    /// Install and activate a worker for the loaded configuration.
    pub async fn register_default(&self) -> Result<Arc<OfflineWorker>, Error> {
        let worker = self.build_worker(self.config.clone())?;
        self.registration.register(worker).await
    }

    pub async fn controller(&self) -> Result<Arc<OfflineWorker>, HostError> {
        self.registration
            .controller()
            .await
            .ok_or_else(|| HostError::NoController("no active worker; call worker_install".into()))
    }
}

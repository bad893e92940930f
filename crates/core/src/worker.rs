//! The offline worker: one versioned instance of the caching engine.
//!
//! Ties the router, strategies, deferred-write queue and push handling to a
//! lifecycle. Requests are only intercepted while the worker is
//! [`WorkerState::Active`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use url::Url;

use crate::Error;
use crate::cache::{CacheDb, CacheNames, QueuedWrite};
use crate::config::AppConfig;
use crate::lifecycle::WorkerState;
use crate::network::Network;
use crate::push::{ClickOutcome, Notification, NotificationHost, PushHandler};
use crate::request::{Request, RequestKey, Response, canonicalize};
use crate::router::{Route, Router};
use crate::strategy::{Retriever, Served};
use crate::sync::{DeferredWriteQueue, DrainReport, SubmitOutcome};

/// Snapshot of a worker for hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatus {
    pub state: WorkerState,
    /// Current generation names: combined, static, dynamic.
    pub generations: Vec<String>,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

pub struct OfflineWorker {
    names: CacheNames,
    precache: Vec<Url>,
    cache: CacheDb,
    network: Arc<dyn Network>,
    router: Router,
    retriever: Retriever,
    queue: DeferredWriteQueue,
    push: PushHandler,
    state: RwLock<WorkerState>,
    install_started: AtomicBool,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

fn resolve(input: &str, origin: &Url) -> Result<Url, Error> {
    canonicalize(input, origin).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
}

impl OfflineWorker {
    /// Build a worker in the `Installing` state.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unusable origin and
    /// `Error::InvalidUrl` for a precache entry or app root that does not
    /// resolve against it.
    pub fn new(
        config: AppConfig,
        cache: CacheDb,
        network: Arc<dyn Network>,
        notifier: Arc<dyn NotificationHost>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let precache = config.precache.iter().map(|u| resolve(u, &origin)).collect::<Result<Vec<_>, _>>()?;
        let app_root = resolve(&config.app_root, &origin)?;

        let names = config.cache_names();
        let router = Router::from_config(&config).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let retriever = Retriever::new(cache.clone(), Arc::clone(&network), names.dynamic.name());
        let queue = DeferredWriteQueue::new(cache.clone(), Arc::clone(&network), origin, config.sync_routes.clone());
        let push = PushHandler::new(&config.icon_url, app_root, notifier);

        Ok(Self {
            names,
            precache,
            cache,
            network,
            router,
            retriever,
            queue,
            push,
            state: RwLock::new(WorkerState::Installing),
            install_started: AtomicBool::new(false),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state().await,
            generations: vec![self.names.combined.name(), self.names.static_assets.name(), self.names.dynamic.name()],
            skip_waiting: self.skip_waiting.load(Ordering::SeqCst),
            clients_claimed: self.clients_claimed.load(Ordering::SeqCst),
        }
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    fn advance(state: &mut WorkerState, next: WorkerState) -> Result<(), Error> {
        if !state.can_transition_to(next) {
            return Err(Error::InvalidState(format!("cannot move from {state:?} to {next:?}")));
        }
        tracing::info!(from = ?*state, to = ?next, "worker state changed");
        *state = next;
        Ok(())
    }

    async fn transition(&self, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        Self::advance(&mut state, next)
    }

    /// Fetch every precache asset and store them all in the static generation.
    ///
    /// Any failed fetch or non-OK status fails the install: the worker becomes
    /// redundant and nothing is stored. Only the first call runs; any other
    /// fails with `Error::InvalidState`.
    pub async fn install(&self) -> Result<(), Error> {
        {
            let state = self.state.write().await;
            if *state != WorkerState::Installing {
                return Err(Error::InvalidState(format!("install called while {:?}", *state)));
            }
            if self.install_started.swap(true, Ordering::SeqCst) {
                return Err(Error::InvalidState("install already in progress".into()));
            }
        }

        let generation = self.names.static_assets.name();
        tracing::info!(assets = self.precache.len(), generation = %generation, "installing worker");

        let stored = match self.fetch_precache().await {
            Ok(entries) => self.cache.put_all(&generation, &entries).await,
            Err(e) => Err(e),
        };

        if let Err(e) = stored {
            tracing::warn!(error = %e, "install failed");
            self.transition(WorkerState::Redundant).await?;
            return Err(e);
        }

        self.transition(WorkerState::Installed).await?;
        self.skip_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_precache(&self) -> Result<Vec<(RequestKey, Response)>, Error> {
        let mut tasks = JoinSet::new();
        for (index, url) in self.precache.iter().cloned().enumerate() {
            let network = Arc::clone(&self.network);
            tasks.spawn(async move {
                let request = Request::get(url);
                let outcome = network.fetch(&request).await;
                (index, request, outcome)
            });
        }

        let mut fetched: Vec<Option<(RequestKey, Response)>> = vec![None; self.precache.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, request, outcome) =
                joined.map_err(|e| Error::InstallFailed { url: "precache".into(), reason: e.to_string() })?;
            let url = request.url.to_string();
            let response = outcome.map_err(|e| Error::InstallFailed { url: url.clone(), reason: e.to_string() })?;
            if !response.is_ok() {
                return Err(Error::InstallFailed { url, reason: format!("status {}", response.status) });
            }
            fetched[index] = Some((request.key(), response));
        }

        Ok(fetched.into_iter().flatten().collect())
    }

    /// Evict stale generations and start intercepting requests.
    ///
    /// Request admission is blocked until eviction finishes.
    pub async fn activate(&self) -> Result<(), Error> {
        let mut state = self.state.write().await;
        Self::advance(&mut state, WorkerState::Activating)?;

        if let Err(e) = self.cache.evict_stale(&self.names.current_names()).await {
            tracing::warn!(error = %e, "activation failed");
            Self::advance(&mut state, WorkerState::Redundant)?;
            return Err(e);
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        Self::advance(&mut state, WorkerState::Active)
    }

    /// A newer version took over.
    pub async fn supersede(&self) -> Result<(), Error> {
        self.transition(WorkerState::Superseded).await
    }

    /// Stop serving for good.
    pub async fn retire(&self) -> Result<(), Error> {
        self.transition(WorkerState::Redundant).await
    }

    /// Answer an intercepted request, or `None` to leave it to the network.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Served> {
        let state = self.state().await;
        if state != WorkerState::Active {
            tracing::debug!(url = %request.url, state = ?state, "not intercepting: worker inactive");
            return None;
        }

        match self.router.classify(request) {
            Route::Bypass(reason) => {
                tracing::debug!(method = %request.method, url = %request.url, reason = ?reason, "bypassed");
                None
            }
            Route::Intercept(strategy) => {
                tracing::debug!(url = %request.url, strategy = ?strategy, "intercepted");
                Some(self.retriever.run(strategy, request).await)
            }
        }
    }

    /// Connectivity-restored signal for `tag`.
    pub async fn handle_sync(&self, tag: &str) -> Result<DrainReport, Error> {
        self.queue.drain(tag).await
    }

    pub async fn enqueue_write(&self, collection: &str, payload: serde_json::Value) -> Result<QueuedWrite, Error> {
        self.queue.enqueue(collection, payload).await
    }

    pub async fn submit(&self, collection: &str, payload: serde_json::Value) -> Result<SubmitOutcome, Error> {
        self.queue.submit(collection, payload).await
    }

    pub async fn pending_writes(&self, tag: &str) -> Result<Vec<QueuedWrite>, Error> {
        self.queue.pending(tag).await
    }

    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Notification {
        self.push.handle_push(payload).await
    }

    pub async fn handle_notification_click(&self, action: Option<&str>) -> ClickOutcome {
        self.push.handle_click(action).await
    }
}

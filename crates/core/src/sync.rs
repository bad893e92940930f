//! Deferred-write queue (background sync).
//!
//! Writes that cannot reach the network are persisted per collection and
//! replayed, oldest first, when the host signals that connectivity is back.
//! Delivery is at-least-once: an entry is deleted only after its replay
//! succeeds, and the first failure stops the drain with every later entry
//! still queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::{CacheDb, NewWrite, QueuedWrite};
use crate::config::SyncRoute;
use crate::network::Network;
use crate::request::{Request, Response, canonicalize};

/// Result of a drain attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainReport {
    /// Every queued write was replayed and the queue cleared.
    Completed { replayed: usize },
    /// A replay failed; it and all later writes remain queued.
    Interrupted { replayed: usize, remaining: usize, error: String },
    /// Another drain of the same tag is in flight.
    AlreadyRunning,
    /// No sync route uses this tag.
    UnknownTag,
}

/// Outcome of submitting a write through the queue.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The network accepted the write.
    Sent(Response),
    /// The write was persisted for the next drain.
    Queued(QueuedWrite),
}

/// Per-tag in-flight marker, released on drop.
struct DrainGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    tag: String,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.tag);
    }
}

/// Persists and replays deferred writes.
pub struct DeferredWriteQueue {
    cache: CacheDb,
    network: Arc<dyn Network>,
    origin: Url,
    routes: Vec<SyncRoute>,
    in_flight: Mutex<HashSet<String>>,
}

impl DeferredWriteQueue {
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, origin: Url, routes: Vec<SyncRoute>) -> Self {
        Self { cache, network, origin, routes, in_flight: Mutex::new(HashSet::new()) }
    }

    fn route(&self, collection: &str) -> Result<&SyncRoute, Error> {
        self.routes
            .iter()
            .find(|r| r.collection == collection)
            .ok_or_else(|| Error::InvalidInput(format!("no sync route for collection: {collection}")))
    }

    /// Persist a write for the collection's sync tag.
    pub async fn enqueue(&self, collection: &str, payload: serde_json::Value) -> Result<QueuedWrite, Error> {
        let route = self.route(collection)?;
        let write = NewWrite {
            tag: route.tag.clone(),
            collection: route.collection.clone(),
            endpoint: route.endpoint.clone(),
            method: route.method.clone(),
            payload,
        };
        let queued = self.cache.enqueue_write(&write).await?;
        tracing::info!(id = queued.id, tag = %queued.tag, collection, "queued deferred write");
        Ok(queued)
    }

    /// Try the write on the network now; queue it if the network is unreachable.
    ///
    /// A response with any HTTP status counts as delivered.
    pub async fn submit(&self, collection: &str, payload: serde_json::Value) -> Result<SubmitOutcome, Error> {
        let route = self.route(collection)?;
        let request = self.replay_request(&route.method, &route.endpoint, &payload)?;

        match self.network.fetch(&request).await {
            Ok(response) => Ok(SubmitOutcome::Sent(response)),
            Err(e) if e.is_network() => {
                tracing::debug!(collection, error = %e, "write deferred until connectivity returns");
                Ok(SubmitOutcome::Queued(self.enqueue(collection, payload).await?))
            }
            Err(e) => Err(e),
        }
    }

    /// Writes currently queued for a tag, oldest first.
    pub async fn pending(&self, tag: &str) -> Result<Vec<QueuedWrite>, Error> {
        self.cache.pending_writes(tag).await
    }

    fn try_begin(&self, tag: &str) -> Option<DrainGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(tag.to_string()) {
            return None;
        }
        Some(DrainGuard { in_flight: &self.in_flight, tag: tag.to_string() })
    }

    fn replay_request(&self, method: &str, endpoint: &str, payload: &serde_json::Value) -> Result<Request, Error> {
        let url = canonicalize(endpoint, &self.origin).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;
        Request::json(method, url, payload)
    }

    /// Replay every write queued under `tag`, in creation order.
    pub async fn drain(&self, tag: &str) -> Result<DrainReport, Error> {
        if !self.routes.iter().any(|r| r.tag == tag) {
            tracing::debug!(tag, "sync event for unknown tag ignored");
            return Ok(DrainReport::UnknownTag);
        }

        let Some(_guard) = self.try_begin(tag) else {
            tracing::debug!(tag, "drain already in flight");
            return Ok(DrainReport::AlreadyRunning);
        };

        let pending = self.cache.pending_writes(tag).await?;
        let total = pending.len();
        let mut replayed = 0;

        for write in &pending {
            let request = self.replay_request(&write.method, &write.endpoint, &write.payload)?;
            let error = match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => None,
                Ok(response) => Some(format!("{} returned status {}", write.endpoint, response.status)),
                Err(e) => Some(e.to_string()),
            };

            if let Some(error) = error {
                let remaining = total - replayed;
                tracing::warn!(tag, id = write.id, remaining, error = %error, "deferred write replay failed");
                return Ok(DrainReport::Interrupted { replayed, remaining, error });
            }

            self.cache.remove_write(write.id).await?;
            replayed += 1;
        }

        if let Some(last) = pending.last() {
            self.cache.clear_writes(tag, last.id).await?;
            tracing::info!(tag, replayed, "deferred writes synced");
        }

        Ok(DrainReport::Completed { replayed })
    }
}

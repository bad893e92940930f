//! Retrieval strategies.
//!
//! Every strategy answers with exactly one response and writes successful
//! (2xx) network responses into the dynamic generation only. Cache read and
//! write failures never reach the caller: a failed read is a miss, a failed
//! write leaves the cache without that entry.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::cache::CacheDb;
use crate::fallback;
use crate::network::Network;
use crate::request::{Request, RequestKey, Response};
use crate::router::Strategy;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
}

/// Outcome of running a strategy.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    /// Background revalidation started by stale-while-revalidate on a cache
    /// hit. Dropping the handle does not cancel it.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    fn new(response: Response, source: Source) -> Self {
        Self { response, source, revalidation: None }
    }
}

/// Runs strategies against the cache store and the network.
#[derive(Clone)]
pub struct Retriever {
    cache: CacheDb,
    network: Arc<dyn Network>,
    dynamic: String,
}

impl Retriever {
    /// `dynamic` is the generation name runtime responses are written to.
    pub fn new(cache: CacheDb, network: Arc<dyn Network>, dynamic: impl Into<String>) -> Self {
        Self { cache, network, dynamic: dynamic.into() }
    }

    pub async fn run(&self, strategy: Strategy, request: &Request) -> Served {
        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        }
    }

    /// Network, then any cached copy, then a 503.
    pub async fn network_first(&self, request: &Request) -> Served {
        let key = request.key();
        match self.network.fetch(request).await {
            Ok(response) => {
                store(&self.cache, &self.dynamic, &key, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "network-first: network failed, trying cache");
                match lookup(&self.cache, &key).await {
                    Some(cached) => Served::new(cached, Source::Cache),
                    None => Served::new(fallback::offline_unavailable(), Source::Fallback),
                }
            }
        }
    }

    /// Any cached copy without touching the network, then network, then a 404.
    pub async fn cache_first(&self, request: &Request) -> Served {
        let key = request.key();
        if let Some(cached) = lookup(&self.cache, &key).await {
            return Served::new(cached, Source::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store(&self.cache, &self.dynamic, &key, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "cache-first: miss and network failed");
                Served::new(fallback::not_found(), Source::Fallback)
            }
        }
    }

    /// Cached copy immediately with a background refresh; on a miss, wait for
    /// the network and fall back to the offline page.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Served {
        let key = request.key();

        if let Some(cached) = lookup(&self.cache, &key).await {
            let cache = self.cache.clone();
            let network = Arc::clone(&self.network);
            let dynamic = self.dynamic.clone();
            let request = request.clone();

            let revalidation = tokio::spawn(async move {
                match network.fetch(&request).await {
                    Ok(fresh) => store(&cache, &dynamic, &request.key(), &fresh).await,
                    Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed; keeping cached copy"),
                }
            });

            return Served { response: cached, source: Source::Cache, revalidation: Some(revalidation) };
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                store(&self.cache, &self.dynamic, &key, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "stale-while-revalidate: miss and network failed");
                Served::new(fallback::offline_page(), Source::Fallback)
            }
        }
    }
}

async fn lookup(cache: &CacheDb, key: &RequestKey) -> Option<Response> {
    match cache.match_request(key, None).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "cache read failed; treating as miss");
            None
        }
    }
}

async fn store(cache: &CacheDb, generation: &str, key: &RequestKey, response: &Response) {
    if !response.is_ok() {
        tracing::debug!(key = %key, status = response.status, "not caching non-2xx response");
        return;
    }
    if let Err(e) = cache.put(generation, key, response).await {
        tracing::warn!(key = %key, error = %e, "cache write failed; response still served");
    }
}

//! cache_purge tool implementation.
//!
//! Purges entries by domain or count. Generations themselves are only
//! dropped by worker activation.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::Error;

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge entries whose URL contains this domain, in every generation.
    #[serde(default)]
    pub domain: Option<String>,

    /// Keep only the newest N entries of `generation` (LRU purge).
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Generation for `max_entries` (default: the dynamic generation).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(host: &WorkerHost, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.domain.is_none() && params.max_entries.is_none() {
        return Err(Error::InvalidInput("Either domain or max_entries must be specified".to_string()).into());
    }

    let mut deleted_total = 0u64;

    if let Some(domain) = params.domain.as_deref() {
        if domain.trim().is_empty() {
            return Err(Error::InvalidInput("domain cannot be empty".into()).into());
        }
        deleted_total += host.cache.purge_by_domain(domain).await?;
    }

    if let Some(max_entries) = params.max_entries {
        let generation = match params.generation.clone() {
            Some(generation) => generation,
            None => match host.registration.controller().await {
                Some(worker) => worker.cache_names().dynamic.name(),
                None => host.config.cache_names().dynamic.name(),
            },
        };
        deleted_total += host.cache.purge_lru(&generation, max_entries).await?;
    }

    json_result(&CachePurgeOutput { deleted: deleted_total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_host, host, parse};
    use swkit_core::{RequestKey, Response};
    use url::Url;

    fn key(url: &str) -> RequestKey {
        RequestKey::new("GET", &Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_purge_by_domain() {
        let (host, _network) = host().await;
        let ok = Response::new(200, "OK", "x");
        host.cache.put("fa-dynamic-v1", &key("https://fonts.googleapis.com/css"), &ok).await.unwrap();
        host.cache.put("fa-dynamic-v1", &key("https://app.example/members"), &ok).await.unwrap();

        let params = CachePurgeParams { domain: Some("fonts.googleapis.com".into()), ..Default::default() };
        let output: CachePurgeOutput = parse(&purge_impl(&host, params).await.unwrap());
        assert_eq!(output.deleted, 1);
    }

    #[tokio::test]
    async fn test_purge_lru_defaults_to_dynamic() {
        let (host, _network) = host().await;
        let ok = Response::new(200, "OK", "x");
        for path in ["a", "b", "c"] {
            let k = key(&format!("https://app.example/{path}"));
            host.cache.put("fa-dynamic-v1", &k, &ok).await.unwrap();
        }

        let params = CachePurgeParams { max_entries: Some(1), ..Default::default() };
        let output: CachePurgeOutput = parse(&purge_impl(&host, params).await.unwrap());
        assert_eq!(output.deleted, 2);

        let left: Vec<String> = host.cache.keys("fa-dynamic-v1").await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(left, vec!["https://app.example/c"]);
    }

    #[tokio::test]
    async fn test_purge_leaves_pending_generation_intact() {
        let (host, _network) = active_host().await;
        let ok = Response::new(200, "OK", "<html>");
        host.cache.put("fa-static-v2", &key("https://app.example/"), &ok).await.unwrap();
        host.cache.put("fa-dynamic-v1", &key("https://cdn.example/lib.js"), &ok).await.unwrap();

        let params = CachePurgeParams {
            domain: Some("cdn.example".into()),
            max_entries: Some(0),
            ..Default::default()
        };
        purge_impl(&host, params).await.unwrap();

        assert!(host.cache.has_generation("fa-static-v2").await.unwrap());
        let left = host.cache.keys("fa-static-v2").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].url, "https://app.example/");
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (host, _network) = host().await;
        let result = purge_impl(&host, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }
}

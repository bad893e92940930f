//! cache_get tool implementation.
//!
//! Looks up a stored response by request, or lists what every generation
//! holds when no URL is given.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::cache::CachedKey;
use swkit_core::request::canonicalize;
use swkit_core::{Error, RequestKey};

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the stored request; omit to list every generation.
    #[serde(default)]
    pub url: Option<String>,

    /// Restrict the lookup to one generation.
    #[serde(default)]
    pub generation: Option<String>,
}

/// A stored response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedEntry {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// One generation and its keys in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationListing {
    pub name: String,
    pub keys: Vec<CachedKey>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheGetOutput {
    Entry(CachedEntry),
    Listing { generations: Vec<GenerationListing> },
}

/// Implementation of the cache_get tool.
pub async fn get_impl(host: &WorkerHost, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let Some(raw_url) = params.url else {
        let mut generations = Vec::new();
        for name in host.cache.generation_names().await? {
            if params.generation.as_ref().is_some_and(|g| *g != name) {
                continue;
            }
            let keys = host.cache.keys(&name).await?;
            generations.push(GenerationListing { name, keys });
        }
        return json_result(&CacheGetOutput::Listing { generations });
    };

    let origin = host.config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&raw_url, &origin).map_err(|e| Error::InvalidUrl(format!("{raw_url}: {e}")))?;
    let key = RequestKey::new("GET", &url);

    let hit = match &params.generation {
        Some(generation) => host.cache.match_in(generation, &key).await?,
        None => host.cache.match_request(&key, None).await?,
    };
    let response = hit.ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let body = response.text();
    json_result(&CacheGetOutput::Entry(CachedEntry {
        url: key.url,
        status: response.status,
        status_text: response.status_text,
        headers: response.headers,
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_host, host, parse};

    #[tokio::test]
    async fn test_get_missing() {
        let (host, _network) = host().await;
        let params = CacheGetParams { url: Some("/nothing".into()), generation: None };
        let err = get_impl(&host, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_precached_entry() {
        let (host, _network) = active_host().await;
        let params = CacheGetParams { url: Some("/".into()), generation: Some("fa-static-v1".into()) };
        let output: CachedEntry = parse(&get_impl(&host, params).await.unwrap());
        assert_eq!(output.url, "https://app.example/");
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "<html>home</html>");
    }

    #[tokio::test]
    async fn test_listing() {
        let (host, _network) = active_host().await;
        let result = get_impl(&host, CacheGetParams::default()).await.unwrap();
        let output: serde_json::Value = parse(&result);
        let generations = output["generations"].as_array().unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0]["name"], "fa-static-v1");
        assert_eq!(generations[0]["keys"][0]["url"], "https://app.example/");
    }
}

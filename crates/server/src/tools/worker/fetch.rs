//! worker_fetch tool implementation.
//!
//! Delivers a fetch event to the controlling worker. Requests the worker does
//! not intercept (no controller, non-GET, cross origin) go straight to the
//! network, as they would without a worker.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::request::canonicalize;
use swkit_core::{Destination, Error, Request, Response, Source};

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; `image` selects cache-first for same-origin URLs.
    #[serde(default)]
    pub destination: Destination,

    /// JSON body for writes.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// Whether the worker answered the request.
    pub intercepted: bool,
    /// Where an intercepted response came from.
    pub source: Option<Source>,
    /// A background refresh of the cached copy was started.
    pub revalidating: bool,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl WorkerFetchOutput {
    fn new(response: Response, source: Option<Source>, revalidating: bool) -> Self {
        let body = response.text();
        Self {
            intercepted: source.is_some(),
            source,
            revalidating,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body,
        }
    }
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(host: &WorkerHost, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let origin = host.config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&params.url, &origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let request = match &params.body {
        Some(body) => Request::json(&params.method, url, body)?,
        None => Request { method: params.method.to_ascii_uppercase(), ..Request::get(url) },
    }
    .with_destination(params.destination);

    if let Some(worker) = host.registration.controller().await
        && let Some(served) = worker.handle_fetch(&request).await
    {
        let revalidating = served.revalidation.is_some();
        return json_result(&WorkerFetchOutput::new(served.response, Some(served.source), revalidating));
    }

    tracing::debug!(method = %request.method, url = %request.url, "passthrough fetch");
    let response = host.network.fetch(&request).await?;
    json_result(&WorkerFetchOutput::new(response, None, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_host, host, parse};

    fn get(url: &str) -> WorkerFetchParams {
        WorkerFetchParams { url: url.into(), method: default_method(), destination: Destination::Document, body: None }
    }

    #[tokio::test]
    async fn test_offline_navigation_served_from_cache() {
        let (host, network) = active_host().await;
        network.unplug();

        let output: WorkerFetchOutput = parse(&fetch_impl(&host, get("/")).await.unwrap());
        assert!(output.intercepted);
        assert_eq!(output.source, Some(Source::Cache));
        assert!(output.revalidating);
        assert_eq!(output.body, "<html>home</html>");
    }

    #[tokio::test]
    async fn test_offline_api_is_503() {
        let (host, network) = active_host().await;
        network.unplug();

        let output: WorkerFetchOutput = parse(&fetch_impl(&host, get("/api/members")).await.unwrap());
        assert_eq!(output.source, Some(Source::Fallback));
        assert_eq!(output.status, 503);
    }

    #[tokio::test]
    async fn test_no_controller_goes_to_network() {
        let (host, network) = host().await;
        let output: WorkerFetchOutput = parse(&fetch_impl(&host, get("/")).await.unwrap());
        assert!(!output.intercepted);
        assert_eq!(output.status, 200);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_post_bypasses_worker() {
        let (host, network) = active_host().await;
        network.serve("https://app.example/api/payments", Response::new(201, "Created", "{}"));

        let params = WorkerFetchParams {
            url: "/api/payments".into(),
            method: "POST".into(),
            destination: Destination::Empty,
            body: Some(serde_json::json!({ "amount": 10 })),
        };
        let output: WorkerFetchOutput = parse(&fetch_impl(&host, params).await.unwrap());
        assert!(!output.intercepted);
        assert_eq!(output.status, 201);
        assert!(host.cache.keys("fa-dynamic-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_url_rejected() {
        let (host, _network) = host().await;
        let err = fetch_impl(&host, get("ftp://files.example/x")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}

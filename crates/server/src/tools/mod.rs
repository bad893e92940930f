//! MCP tool implementations.
//!
//! This module contains all tools exposed by the worker host.

pub mod cache;
pub mod push;
pub mod queue_write;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::HostError;

/// Serialize tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| HostError::EncodeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use swkit_core::{AppConfig, CacheDb, Error, Network, Request, Response};

    use crate::host::WorkerHost;
    use crate::notifier::LogNotifier;

    /// Network answering from a URL table; anything else is unreachable.
    #[derive(Default)]
    pub struct StubNetwork {
        pub routes: Mutex<HashMap<String, Response>>,
        pub calls: AtomicUsize,
    }

    impl StubNetwork {
        pub fn serve(&self, url: &str, response: Response) {
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }

        pub fn unplug(&self) {
            self.routes.lock().unwrap().clear();
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.routes
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
        }
    }

    pub fn config() -> AppConfig {
        AppConfig {
            origin: "https://app.example".into(),
            cache_prefix: "fa".into(),
            precache: vec!["/".into()],
            ..Default::default()
        }
    }

    /// Host with an online network serving the precache.
    pub async fn host() -> (WorkerHost, Arc<StubNetwork>) {
        let network = Arc::new(StubNetwork::default());
        network.serve("https://app.example/", Response::new(200, "OK", "<html>home</html>"));
        let cache = CacheDb::open_in_memory().await.unwrap();
        (WorkerHost::new(config(), cache, network.clone(), Arc::new(LogNotifier)), network)
    }

    /// Host with a registered, active worker.
    pub async fn active_host() -> (WorkerHost, Arc<StubNetwork>) {
        let (host, network) = host().await;
        host.register_default().await.unwrap();
        (host, network)
    }

    pub fn parse<T: DeserializeOwned>(result: &rmcp::model::CallToolResult) -> T {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}

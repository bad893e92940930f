//! worker_status tool implementation.
//!
//! Reports the controlling worker, the generations in storage and how many
//! deferred writes wait per sync tag.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::WorkerStatus;
use swkit_core::cache::GenerationStats;

use crate::host::WorkerHost;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PendingCount {
    pub tag: String,
    pub pending: u64,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// The controlling worker, if one is registered.
    pub controller: Option<WorkerStatus>,
    pub update_available: bool,
    /// Every generation in storage with its entry count.
    pub generations: Vec<GenerationStats>,
    pub queue: Vec<PendingCount>,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let mut controller = None;
    if let Some(worker) = host.registration.controller().await {
        controller = Some(worker.status().await);
    }

    let mut queue = Vec::with_capacity(host.config.sync_routes.len());
    for route in &host.config.sync_routes {
        let pending = host.cache.count_writes(&route.tag).await?;
        queue.push(PendingCount { tag: route.tag.clone(), pending });
    }

    let output = WorkerStatusOutput {
        controller,
        update_available: host.registration.update_available(),
        generations: host.cache.stats().await?,
        queue,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_host, host, parse};
    use swkit_core::WorkerState;

    #[tokio::test]
    async fn test_status_before_install() {
        let (host, _network) = host().await;
        let output: WorkerStatusOutput = parse(&status_impl(&host).await.unwrap());
        assert!(output.controller.is_none());
        assert!(output.generations.is_empty());
        assert_eq!(output.queue[0].tag, "payment-sync");
        assert_eq!(output.queue[0].pending, 0);
    }

    #[tokio::test]
    async fn test_status_after_install() {
        let (host, _network) = active_host().await;
        let output: WorkerStatusOutput = parse(&status_impl(&host).await.unwrap());
        assert_eq!(output.controller.unwrap().state, WorkerState::Active);
        assert_eq!(output.generations[0].name, "fa-static-v1");
        assert_eq!(output.generations[0].entries, 1);
    }
}

//! queue_write tool implementation.
//!
//! Submits a write for a configured collection. When the network is
//! unreachable, or `defer` is set, the write is queued for the collection's
//! sync tag instead.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::SubmitOutcome;
use swkit_core::cache::QueuedWrite;

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the queue_write tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueWriteParams {
    /// Collection with a configured sync route, e.g. "payments".
    pub collection: String,

    /// JSON document to write.
    pub payload: serde_json::Value,

    /// Queue without trying the network first.
    #[serde(default)]
    pub defer: bool,
}

/// Output from the queue_write tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum QueueWriteOutput {
    Sent { status: u16 },
    Queued { id: i64, tag: String, storage_key: String },
}

impl From<&QueuedWrite> for QueueWriteOutput {
    fn from(write: &QueuedWrite) -> Self {
        QueueWriteOutput::Queued { id: write.id, tag: write.tag.clone(), storage_key: write.storage_key.clone() }
    }
}

/// Implementation of the queue_write tool.
pub async fn queue_write_impl(host: &WorkerHost, params: QueueWriteParams) -> Result<CallToolResult, McpError> {
    let worker = host.controller().await?;

    let output = if params.defer {
        let write = worker.enqueue_write(&params.collection, params.payload).await?;
        QueueWriteOutput::from(&write)
    } else {
        match worker.submit(&params.collection, params.payload).await? {
            SubmitOutcome::Sent(response) => QueueWriteOutput::Sent { status: response.status },
            SubmitOutcome::Queued(write) => QueueWriteOutput::from(&write),
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_host, parse};
    use swkit_core::Response;

    fn params(defer: bool) -> QueueWriteParams {
        QueueWriteParams { collection: "payments".into(), payload: serde_json::json!({ "amount": 300 }), defer }
    }

    #[tokio::test]
    async fn test_offline_write_is_queued() {
        let (host, _network) = active_host().await;
        let output: QueueWriteOutput = parse(&queue_write_impl(&host, params(false)).await.unwrap());
        match output {
            QueueWriteOutput::Queued { tag, storage_key, .. } => {
                assert_eq!(tag, "payment-sync");
                assert_eq!(storage_key, "/offline-data/payments");
            }
            other => panic!("expected queued, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_online_write_is_sent() {
        let (host, network) = active_host().await;
        network.serve("https://app.example/api/payments", Response::new(201, "Created", ""));

        let output: QueueWriteOutput = parse(&queue_write_impl(&host, params(false)).await.unwrap());
        assert!(matches!(output, QueueWriteOutput::Sent { status: 201 }));
        assert_eq!(host.cache.count_writes("payment-sync").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_defer_skips_network() {
        let (host, network) = active_host().await;
        let calls = network.calls();
        let output: QueueWriteOutput = parse(&queue_write_impl(&host, params(true)).await.unwrap());
        assert!(matches!(output, QueueWriteOutput::Queued { .. }));
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let (host, _network) = active_host().await;
        let bad = QueueWriteParams { collection: "notices".into(), payload: serde_json::json!({}), defer: true };
        let err = queue_write_impl(&host, bad).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}

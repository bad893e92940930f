//! worker_sync tool implementation.
//!
//! Signals that connectivity is back for a sync tag, draining its queued
//! writes in creation order.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::Error;

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync tag, e.g. "payment-sync".
    pub tag: String,
}

/// Implementation of the worker_sync tool.
pub async fn sync_impl(host: &WorkerHost, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(Error::InvalidInput("tag cannot be empty".into()).into());
    }

    let worker = host.controller().await?;
    let report = worker.handle_sync(&params.tag).await?;
    json_result(&report)
}

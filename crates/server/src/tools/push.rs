//! worker_push and notification_click tool implementations.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push message text; a JSON document is also attached as routing data.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Clicked action ("view", "close"), or none for the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Implementation of the worker_push tool.
pub async fn push_impl(host: &WorkerHost, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    let worker = host.controller().await?;
    let notification = worker.handle_push(params.payload.as_deref().map(str::as_bytes)).await;
    json_result(&notification)
}

/// Implementation of the notification_click tool.
pub async fn click_impl(host: &WorkerHost, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let worker = host.controller().await?;
    let outcome = worker.handle_notification_click(params.action.as_deref()).await;
    json_result(&outcome)
}

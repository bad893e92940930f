//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::WorkerHost;
use crate::tools::cache::{CachePurgeParams, CacheGetParams, get_impl, purge_impl};
use crate::tools::push::{NotificationClickParams, WorkerPushParams, click_impl, push_impl};
use crate::tools::queue_write::{QueueWriteParams, queue_write_impl};
use crate::tools::worker::{
    WorkerFetchParams, WorkerInstallParams, WorkerSyncParams, fetch_impl, install_impl, status_impl, sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler exposing the offline worker's events.
#[derive(Clone)]
pub struct WorkerServer {
    host: Arc<WorkerHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    pub fn new(host: Arc<WorkerHost>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Install and activate a worker version: precache every asset, evict stale cache generations, take over from the previous version."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.host, params.0).await
    }

    #[tool(description = "Report the controlling worker's state, stored generations and pending deferred writes.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(
        description = "Deliver a fetch event. Returns the response the worker served (network, cache or offline fallback), or the plain network response when the request is not intercepted."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Submit a write for a collection; queued for background sync when the network is unreachable.")]
    async fn queue_write(&self, params: Parameters<QueueWriteParams>) -> Result<CallToolResult, McpError> {
        queue_write_impl(&self.host, params.0).await
    }

    #[tool(description = "Signal restored connectivity for a sync tag and replay its queued writes in order.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.host, params.0).await
    }

    #[tool(description = "Deliver a push message and show the resulting notification.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.host, params.0).await
    }

    #[tool(description = "Click a notification or one of its actions (\"view\" opens the app).")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.host, params.0).await
    }

    #[tool(description = "Look up a cached response by URL, or list every generation's keys.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.host, params.0).await
    }

    #[tool(description = "Purge cached entries by domain, or keep only the newest N entries of one generation.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.host, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swkit-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::host;

    #[tokio::test]
    async fn test_every_tool_is_listed() {
        let (host, _network) = host().await;
        let server = WorkerServer::new(Arc::new(host));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_purge",
                "notification_click",
                "queue_write",
                "worker_fetch",
                "worker_install",
                "worker_push",
                "worker_status",
                "worker_sync",
            ]
        );
    }
}

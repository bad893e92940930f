//! worker_install tool implementation.
//!
//! Installs and activates a worker version, optionally with new cache
//! version tags. A failed install leaves the current controller in place.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swkit_core::{Error, WorkerStatus};

use crate::host::WorkerHost;
use crate::tools::json_result;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Version tag for the static generation (default: configured value).
    #[serde(default)]
    pub static_version: Option<String>,

    /// Version tag for the dynamic generation (default: configured value).
    #[serde(default)]
    pub dynamic_version: Option<String>,
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub status: WorkerStatus,
    /// True once a newer version has replaced a previous controller.
    pub update_available: bool,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(host: &WorkerHost, params: WorkerInstallParams) -> Result<CallToolResult, McpError> {
    let mut config = host.config.clone();
    if let Some(version) = params.static_version {
        config.static_version = version;
    }
    if let Some(version) = params.dynamic_version {
        config.dynamic_version = version;
    }
    config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

    let worker = host.build_worker(config)?;
    let worker = host.registration.register(worker).await?;

    let output =
        WorkerInstallOutput { status: worker.status().await, update_available: host.registration.update_available() };
    json_result(&output)
}

//! swkit-worker entry point.
//!
//! Boots the offline worker behind an MCP server on stdio transport. A worker
//! for the loaded configuration is installed at startup; if that fails (e.g.
//! the app is unreachable) the server still starts and `worker_install` can be
//! retried. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swkit_client::{FetchConfig, HttpNetwork};
use swkit_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod host;
mod notifier;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting swkit-worker on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let host = Arc::new(host::WorkerHost::new(config, cache, network, Arc::new(notifier::LogNotifier)));

    if let Err(e) = host.register_default().await {
        tracing::warn!(error = %e, "initial worker install failed; serving without a controller");
    }

    let handler = handler::WorkerServer::new(host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

//! Host-provided network access.

use async_trait::async_trait;

use crate::Error;
use crate::request::{Request, Response};

/// Performs a real network round trip for the engine.
///
/// Any HTTP status is a successful fetch; only transport failures
/// (refused, DNS, TLS, timeout, oversized body) are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

//! Request classification.
//!
//! Decision order (first match wins):
//! 1. Non-GET: bypass
//! 2. Same origin, URL contains the API pattern: network-first
//! 3. Same origin, image destination: cache-first
//! 4. Same origin, anything else: stale-while-revalidate
//! 5. Cross origin, host on the allow-list: cache-first
//! 6. Cross origin otherwise: bypass

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{AppConfig, ConfigError};
use crate::request::{Destination, Request};

/// Retrieval algorithm chosen for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

/// Why a request is left to the default network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    NonGet,
    CrossOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Intercept(Strategy),
    Bypass(BypassReason),
}

/// Stateless classifier for intercepted requests.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    api_pattern: String,
    allowlist: Vec<String>,
}

impl Router {
    pub fn new(origin: Url, api_pattern: impl Into<String>, allowlist: Vec<String>) -> Self {
        Self { origin, api_pattern: api_pattern.into(), allowlist }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.origin_url()?, &config.api_pattern, config.cross_origin_allowlist.clone()))
    }

    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_get() {
            return Route::Bypass(BypassReason::NonGet);
        }

        if request.url.origin() == self.origin.origin() {
            if request.url.as_str().contains(&self.api_pattern) {
                Route::Intercept(Strategy::NetworkFirst)
            } else if request.destination == Destination::Image {
                Route::Intercept(Strategy::CacheFirst)
            } else {
                Route::Intercept(Strategy::StaleWhileRevalidate)
            }
        } else {
            let host = request.url.host_str().unwrap_or_default();
            if self.allowlist.iter().any(|allowed| host.contains(allowed.as_str())) {
                Route::Intercept(Strategy::CacheFirst)
            } else {
                Route::Bypass(BypassReason::CrossOrigin)
            }
        }
    }
}

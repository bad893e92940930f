//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWKIT_*)
//! 2. TOML config file (if SWKIT_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! List-valued fields take figment's array syntax when set from the
//! environment, e.g. `SWKIT_CROSS_ORIGIN_ALLOWLIST='["fonts.gstatic.com"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{CacheNames, GenerationId, Role};

mod validation;

pub use validation::ConfigError;

/// Logo shipped with the portal; used for notifications and the offline page.
pub const DEFAULT_ICON_URL: &str =
    "https://pub-cdn.sider.ai/u/U0VEHZKN5R2/web-coder/68847972f702e9eb3765e2af/resource/6da62bc0-9a63-492b-be95-a8c8f1de3dd1.png";

/// A background-sync route: which tag drains which queued collection, and where to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRoute {
    /// Tag delivered by the host's connectivity-restored signal.
    pub tag: String,
    /// Logical collection name; one collection per write type.
    pub collection: String,
    /// Endpoint the queued writes are replayed against (relative to `origin`).
    pub endpoint: String,
    /// HTTP method used for replay.
    #[serde(default = "default_sync_method")]
    pub method: String,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWKIT_*)
/// 2. TOML config file (if SWKIT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application the worker serves (scheme, host, port).
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag of the static (precache) generation.
    #[serde(default = "default_static_version")]
    pub static_version: String,

    /// Version tag of the dynamic (runtime) generation.
    #[serde(default = "default_dynamic_version")]
    pub dynamic_version: String,

    /// Version tag of the combined name kept for upgrade compatibility.
    #[serde(default = "default_legacy_version")]
    pub legacy_version: String,

    /// Same-origin URLs containing this substring are API calls (network-first).
    #[serde(default = "default_api_pattern")]
    pub api_pattern: String,

    /// Host substrings of cross-origin servers whose assets are cached.
    #[serde(default = "default_cross_origin_allowlist")]
    pub cross_origin_allowlist: Vec<String>,

    /// Assets that must be cached before the worker may activate.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Background-sync routes for deferred writes.
    #[serde(default = "default_sync_routes")]
    pub sync_routes: Vec<SyncRoute>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Icon and badge used for push notifications.
    #[serde(default = "default_icon_url")]
    pub icon_url: String,

    /// Page opened when a notification's "view" action is clicked.
    #[serde(default = "default_app_root")]
    pub app_root: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swkit-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "friends-association".into()
}

fn default_static_version() -> String {
    "v1".into()
}

fn default_dynamic_version() -> String {
    "v1".into()
}

fn default_legacy_version() -> String {
    "v2.0.0".into()
}

fn default_api_pattern() -> String {
    "/api/".into()
}

fn default_cross_origin_allowlist() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "pub-cdn.sider.ai".into()]
}

fn default_precache() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "/manifest.json".into(),
        "/src/shadcn.css".into(),
        "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap".into(),
        DEFAULT_ICON_URL.into(),
    ]
}

fn default_sync_method() -> String {
    "POST".into()
}

fn default_sync_routes() -> Vec<SyncRoute> {
    vec![SyncRoute {
        tag: "payment-sync".into(),
        collection: "payments".into(),
        endpoint: "/api/payments".into(),
        method: default_sync_method(),
    }]
}

fn default_user_agent() -> String {
    "swkit/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_icon_url() -> String {
    DEFAULT_ICON_URL.into()
}

fn default_app_root() -> String {
    "/".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            static_version: default_static_version(),
            dynamic_version: default_dynamic_version(),
            legacy_version: default_legacy_version(),
            api_pattern: default_api_pattern(),
            cross_origin_allowlist: default_cross_origin_allowlist(),
            precache: default_precache(),
            sync_routes: default_sync_routes(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            icon_url: default_icon_url(),
            app_root: default_app_root(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// The three generation identities the current version owns.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames {
            combined: GenerationId::new(&self.cache_prefix, Role::Combined, &self.legacy_version),
            static_assets: GenerationId::new(&self.cache_prefix, Role::Static, &self.static_version),
            dynamic: GenerationId::new(&self.cache_prefix, Role::Dynamic, &self.dynamic_version),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWKIT_`
    /// 2. TOML file from `SWKIT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWKIT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWKIT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swkit-cache.sqlite"));
        assert_eq!(config.api_pattern, "/api/");
        assert_eq!(config.precache.len(), 6);
        assert_eq!(config.cross_origin_allowlist, vec!["fonts.googleapis.com", "pub-cdn.sider.ai"]);
        assert_eq!(config.sync_routes[0].tag, "payment-sync");
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_default_cache_names() {
        let names = AppConfig::default().cache_names();
        assert_eq!(names.combined.name(), "friends-association-v2.0.0");
        assert_eq!(names.static_assets.name(), "friends-association-static-v1");
        assert_eq!(names.dynamic.name(), "friends-association-dynamic-v1");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let config = AppConfig { origin: "ftp://files.example".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SWKIT_ORIGIN", "https://members.example");
            jail.set_env("SWKIT_DYNAMIC_VERSION", "v7");
            jail.set_env("SWKIT_CROSS_ORIGIN_ALLOWLIST", r#"["fonts.gstatic.com"]"#);

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "https://members.example");
            assert_eq!(config.cache_names().dynamic.name(), "friends-association-dynamic-v7");
            assert_eq!(config.cross_origin_allowlist, vec!["fonts.gstatic.com"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "swkit.toml",
                r#"
                cache_prefix = "members"

                [[sync_routes]]
                tag = "notice-sync"
                collection = "notices"
                endpoint = "/api/notices"
                "#,
            )?;
            jail.set_env("SWKIT_CONFIG_FILE", "swkit.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_prefix, "members");
            assert_eq!(config.sync_routes.len(), 1);
            assert_eq!(config.sync_routes[0].method, "POST");
            Ok(())
        });
    }
}

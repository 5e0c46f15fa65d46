//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::lifecycle::StaticFamily;
use crate::router::RouteRule;
use crate::worker::WorkerConfig;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file holding every store.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds. A timeout counts as a network failure.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deployment version tag. Changing it rotates the static store.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Name prefix of the versioned static store family.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Name of the derived store pruned by client reconciliation.
    #[serde(default = "default_derived_store")]
    pub derived_store: String,

    /// Origin the manifest paths are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Relative paths of the app shell assets fetched at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Ordered routing rules; the first match wins.
    #[serde(default)]
    pub routes: Vec<RouteRule>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_version() -> String {
    "1".into()
}

fn default_static_prefix() -> String {
    "static-".into()
}

fn default_derived_store() -> String {
    "pics".into()
}

fn default_base_url() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    vec!["index.html".into(), "app.js".into(), "styles.css".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            version: default_version(),
            static_prefix: default_static_prefix(),
            derived_store: default_derived_store(),
            base_url: default_base_url(),
            manifest: default_manifest(),
            routes: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn static_family(&self) -> StaticFamily {
        StaticFamily::new(&self.static_prefix, &self.version)
    }

    /// Resolve the manifest paths to absolute URLs against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the base URL or a path does not parse.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;

        self.manifest
            .iter()
            .map(|path| {
                base.join(path)
                    .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: format!("{path}: {e}") })
            })
            .collect()
    }

    /// Build the worker's view of this configuration.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            family: self.static_family(),
            derived_store: self.derived_store.clone(),
            manifest: self.manifest_urls()?,
            routes: self.routes.clone(),
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

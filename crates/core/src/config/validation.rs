//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::router::Router;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `static_prefix` is empty
    /// - `derived_store` is empty or would fall in the static family
    /// - `base_url` or a manifest path does not resolve
    /// - a route does not have exactly one matcher
    ///
    /// Returns `ConfigError::Missing` if `version` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set SHELLCACHE_VERSION to the deployment's version tag".into(),
            });
        }

        if self.static_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "static_prefix".into(), reason: "must not be empty".into() });
        }

        if self.derived_store.is_empty() {
            return Err(ConfigError::Invalid { field: "derived_store".into(), reason: "must not be empty".into() });
        }
        if self.derived_store.starts_with(&self.static_prefix) {
            return Err(ConfigError::Invalid {
                field: "derived_store".into(),
                reason: format!("must not start with the static prefix {:?}", self.static_prefix),
            });
        }

        self.manifest_urls()?;

        let family = self.static_family();
        Router::new(&self.routes, &family.current(), &self.derived_store)
            .map_err(|e| ConfigError::Invalid { field: "routes".into(), reason: e.to_string() })?;

        for store in self.routes.iter().filter_map(|r| r.store.as_deref()) {
            if family.is_stale(store) {
                tracing::warn!(store, "route targets a static-family store that the next activation will delete");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{RouteRule, StrategyKind};

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: " ".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_derived_store_outside_static_family() {
        let config = AppConfig { derived_store: "static-pics".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "derived_store"));
    }

    #[test]
    fn test_validate_bad_route() {
        let rule = RouteRule { host: None, contains: None, strategy: StrategyKind::StaticCache, store: None };
        let config = AppConfig { routes: vec![rule], ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "routes"));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let config = AppConfig { base_url: "localhost".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "base_url"));
    }
}

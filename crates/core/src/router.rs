//! URL classification into a caching strategy and target store.
//!
//! Rules are checked in order and the first match wins. A request that no
//! rule matches is passed through to the network untouched and uncached.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Which strategy a configured rule selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Cache-first against the current static store.
    StaticCache,
    /// Network-first with cache fallback.
    FallbackCache,
    /// Cache-first against the derived store.
    DerivedCache,
}

/// One routing rule as written in configuration.
///
/// Exactly one of `host` and `contains` must be set. `store` overrides the
/// target store the strategy would otherwise use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub store: Option<String>,
}

impl RouteRule {
    pub fn host(host: impl Into<String>, strategy: StrategyKind) -> Self {
        Self { host: Some(host.into()), contains: None, strategy, store: None }
    }

    pub fn contains(fragment: impl Into<String>, strategy: StrategyKind) -> Self {
        Self { host: None, contains: Some(fragment.into()), strategy, store: None }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    StaticCache { store: String },
    FallbackCache { store: String },
    DerivedCache { store: String },
    PassThrough,
}

#[derive(Debug, Clone)]
enum Matcher {
    Host(String),
    Contains(String),
}

impl Matcher {
    fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::Host(host) => url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(host)),
            Matcher::Contains(fragment) => url.as_str().contains(fragment.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    matcher: Matcher,
    route: Route,
}

/// Ordered rule list with the store names it routes into.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<CompiledRule>,
}

impl Router {
    /// Build a router. `static_store` and `derived_store` are the default
    /// targets for rules that do not name a store.
    pub fn new(rules: &[RouteRule], static_store: &str, derived_store: &str) -> Result<Self, Error> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let matcher = match (&rule.host, &rule.contains) {
                    (Some(host), None) if !host.is_empty() => Matcher::Host(host.to_lowercase()),
                    (None, Some(fragment)) if !fragment.is_empty() => Matcher::Contains(fragment.clone()),
                    _ => {
                        return Err(Error::InvalidInput(format!(
                            "route {index}: exactly one non-empty `host` or `contains` is required"
                        )));
                    }
                };

                let store = |default: &str| rule.store.clone().unwrap_or_else(|| default.to_string());
                let route = match rule.strategy {
                    StrategyKind::StaticCache => Route::StaticCache { store: store(static_store) },
                    StrategyKind::FallbackCache => Route::FallbackCache { store: store(static_store) },
                    StrategyKind::DerivedCache => Route::DerivedCache { store: store(derived_store) },
                };

                Ok(CompiledRule { matcher, route })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { rules })
    }

    pub fn classify(&self, url: &Url) -> Route {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(url))
            .map(|rule| rule.route.clone())
            .unwrap_or(Route::PassThrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        let rules = vec![
            RouteRule::contains("/feed", StrategyKind::FallbackCache),
            RouteRule::host("images.example.com", StrategyKind::DerivedCache),
            RouteRule::host("app.example.com", StrategyKind::StaticCache),
            RouteRule::contains("/avatars/", StrategyKind::StaticCache).with_store("avatars"),
        ];
        Router::new(&rules, "static-1.0", "pics").unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let route = router().classify(&url("https://app.example.com/feed?page=1"));
        assert_eq!(route, Route::FallbackCache { store: "static-1.0".into() });
    }

    #[test]
    fn test_host_match_is_exact() {
        let r = router();
        assert_eq!(r.classify(&url("https://IMAGES.example.com/1.jpg")), Route::DerivedCache { store: "pics".into() });
        assert_eq!(r.classify(&url("https://cdn.images.example.com/1.jpg")), Route::PassThrough);
    }

    #[test]
    fn test_static_and_store_override() {
        let r = router();
        assert_eq!(r.classify(&url("https://app.example.com/app.js")), Route::StaticCache {
            store: "static-1.0".into()
        });
        assert_eq!(r.classify(&url("https://cdn.example.com/avatars/9.png")), Route::StaticCache {
            store: "avatars".into()
        });
    }

    #[test]
    fn test_no_match_passes_through() {
        assert_eq!(router().classify(&url("https://elsewhere.org/")), Route::PassThrough);
        let empty = Router::new(&[], "static-1.0", "pics").unwrap();
        assert_eq!(empty.classify(&url("https://app.example.com/")), Route::PassThrough);
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let both = RouteRule {
            host: Some("a.com".into()),
            contains: Some("/x".into()),
            strategy: StrategyKind::StaticCache,
            store: None,
        };
        assert!(Router::new(&[both], "static-1.0", "pics").is_err());

        let neither = RouteRule { host: None, contains: None, strategy: StrategyKind::StaticCache, store: None };
        assert!(Router::new(&[neither], "static-1.0", "pics").is_err());
    }

    #[test]
    fn test_rule_deserializes_from_toml_shape() {
        let rule: RouteRule =
            serde_json::from_str(r#"{"host": "images.example.com", "strategy": "derived_cache"}"#).unwrap();
        assert_eq!(rule, RouteRule::host("images.example.com", StrategyKind::DerivedCache));
    }
}

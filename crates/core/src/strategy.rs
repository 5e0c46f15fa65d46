//! Caching strategies.
//!
//! Each strategy maps a request and an explicitly named target store to an
//! [`Outcome`]. Archiving a fetched response is best-effort: a store failure
//! is logged and the response is still returned.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::StoreManager;
use crate::network::Network;
use crate::router::Route;
use crate::{CachedResponse, Error, Request, ResponseSource};

/// Default bound on a single network call.
pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of running a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Served { response: CachedResponse, source: ResponseSource },
    /// Network-first found neither a usable response nor a cached one.
    Unavailable,
}

impl Outcome {
    fn network(response: CachedResponse) -> Self {
        Outcome::Served { response, source: ResponseSource::Network }
    }

    fn cache(response: CachedResponse) -> Self {
        Outcome::Served { response, source: ResponseSource::Cache }
    }

    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Outcome::Served { response, .. } => Some(response),
            Outcome::Unavailable => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Outcome::Served { source, .. } => Some(*source),
            Outcome::Unavailable => None,
        }
    }
}

/// Runs strategies against a shared store system and network.
#[derive(Clone)]
pub struct StrategyEngine {
    stores: Arc<dyn StoreManager>,
    network: Arc<dyn Network>,
    timeout: Duration,
}

impl StrategyEngine {
    pub fn new(stores: Arc<dyn StoreManager>, network: Arc<dyn Network>) -> Self {
        Self { stores, network, timeout: DEFAULT_NETWORK_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stores(&self) -> &Arc<dyn StoreManager> {
        &self.stores
    }

    /// One network call, bounded by the engine timeout.
    pub async fn fetch_network(&self, request: &Request) -> Result<CachedResponse, Error> {
        match tokio::time::timeout(self.timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::NetworkUnavailable(format!(
                "{} timed out after {}ms",
                request.identity,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Dispatch a routed request to its strategy.
    pub async fn execute(&self, route: &Route, request: &Request) -> Result<Outcome, Error> {
        match route {
            Route::StaticCache { store } => self.static_cache(request, store).await,
            Route::FallbackCache { store } => self.fallback_cache(request, store).await,
            Route::DerivedCache { store } => self.derived_cache(request, store).await,
            Route::PassThrough => self.pass_through(request).await,
        }
    }

    /// Cache-first with network fallback.
    ///
    /// A hit is returned without touching the network. A miss goes to the
    /// network; an OK response is archived into `store`. Transport failures
    /// propagate since there is nothing left to fall back to.
    pub async fn static_cache(&self, request: &Request, store: &str) -> Result<Outcome, Error> {
        let handle = match self.stores.find(store).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(store, error = %e, "store unavailable, going to network");
                None
            }
        };

        if let Some(handle) = &handle {
            match self.stores.get(handle, &request.identity).await {
                Ok(Some(cached)) => {
                    tracing::debug!(store, key = %request.identity, "cache hit");
                    return Ok(Outcome::cache(cached));
                }
                Ok(None) => tracing::debug!(store, key = %request.identity, "cache miss"),
                Err(e) => tracing::warn!(store, key = %request.identity, error = %e, "cache lookup failed"),
            }
        }

        let response = self.fetch_network(request).await?;
        if response.is_ok() {
            self.archive(store, request, &response).await;
        } else {
            tracing::debug!(key = %request.identity, status = response.status, "not archiving non-OK response");
        }
        Ok(Outcome::network(response))
    }

    /// Network-first with cache fallback.
    ///
    /// A non-OK status counts as a failure just like a transport error. On
    /// failure the cached entry is returned if present, otherwise
    /// [`Outcome::Unavailable`].
    pub async fn fallback_cache(&self, request: &Request, store: &str) -> Result<Outcome, Error> {
        let failure = match self.fetch_network(request).await {
            Ok(response) if response.is_ok() => {
                self.archive(store, request, &response).await;
                return Ok(Outcome::network(response));
            }
            Ok(response) => {
                Error::NonSuccessStatus { status: response.status, url: request.url().to_string() }
            }
            Err(e) => e,
        };

        tracing::debug!(key = %request.identity, error = %failure, "network failed, falling back to cache");

        let lookup = async {
            match self.stores.find(store).await? {
                Some(handle) => self.stores.get(&handle, &request.identity).await,
                None => Ok(None),
            }
        };

        match lookup.await {
            Ok(Some(cached)) => Ok(Outcome::cache(cached)),
            Ok(None) => Ok(Outcome::Unavailable),
            Err(e) => {
                tracing::warn!(store, key = %request.identity, error = %e, "fallback lookup failed");
                Ok(Outcome::Unavailable)
            }
        }
    }

    /// Cache-first against a derived (unversioned) store.
    pub async fn derived_cache(&self, request: &Request, store: &str) -> Result<Outcome, Error> {
        self.static_cache(request, store).await
    }

    /// Straight to the network, nothing read or written.
    pub async fn pass_through(&self, request: &Request) -> Result<Outcome, Error> {
        self.fetch_network(request).await.map(Outcome::network)
    }

    async fn archive(&self, store: &str, request: &Request, response: &CachedResponse) {
        let result = async {
            let handle = self.stores.open(store).await?;
            self.stores.put(&handle, &request.identity, response).await
        };

        if let Err(e) = result.await {
            tracing::warn!(store, key = %request.identity, error = %e, "failed to archive response");
        }
    }
}

//! The network collaborator seen by the strategy engine.

use async_trait::async_trait;

use crate::{CachedResponse, Error, Request};

/// Performs a live request.
///
/// Implementations return HTTP error statuses as ordinary responses and
/// reserve `Err` for transport failures (`Error::NetworkUnavailable`).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error>;
}

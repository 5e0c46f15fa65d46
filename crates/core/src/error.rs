//! Unified error types for shellcache.
//!
//! The first four kinds are the ones the interception engine reasons about;
//! the rest cover input validation, schema setup and the worker channel.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the interception layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network call failed before a response arrived (transport error or timeout).
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// A response arrived but its status is outside 200-299.
    #[error("NON_SUCCESS_STATUS: {status} for {url}")]
    NonSuccessStatus { status: u16, url: String },

    /// The durable store rejected an operation (quota, permission, I/O).
    #[error("STORE_UNAVAILABLE: {0}")]
    StoreUnavailable(tokio_rusqlite::Error),

    /// A static manifest asset could not be fetched during install.
    #[error("MANIFEST_FETCH_FAILED: {url}: {reason}")]
    ManifestFetchFailed { url: String, reason: String },

    /// Migration failed to apply.
    #[error("STORE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters (e.g., an unknown store name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The worker loop has shut down and no longer accepts events.
    #[error("WORKER_STOPPED")]
    WorkerStopped,
}

impl Error {
    /// Whether this error should push a network-first strategy onto its cache fallback.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_) | Error::NonSuccessStatus { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::StoreUnavailable(tokio_rusqlite::Error::Close(c)),
            _ => Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::StoreUnavailable(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StoreUnavailable(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32602, msg.clone()),
            Error::NetworkUnavailable(msg) => (-32010, msg.clone()),
            Error::NonSuccessStatus { status, url } => (-32011, format!("status {status} for {url}")),
            Error::ManifestFetchFailed { url, reason } => (-32012, format!("{url}: {reason}")),
            Error::StoreUnavailable(e) => (-32013, e.to_string()),
            Error::MigrationFailed(msg) => (-32013, msg.clone()),
            Error::WorkerStopped => (-32014, "worker stopped".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

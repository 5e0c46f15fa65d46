//! Core of the shellcache interception layer.
//!
//! This crate provides:
//! - Named response stores with a SQLite backend
//! - URL routing and the three caching strategies
//! - The versioned static store lifecycle (install / activate)
//! - Client-driven reconciliation of the derived store
//! - The worker dispatch loop tying them together
//! - Configuration and unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod network;
pub mod reconcile;
pub mod request;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use cache::{CacheDb, StoreHandle, StoreManager};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use network::Network;
pub use reconcile::ClientMessage;
pub use request::{CachedResponse, Request, RequestIdentity, ResponseSource};
pub use router::{Route, RouteRule, Router, StrategyKind};
pub use strategy::{Outcome, StrategyEngine};
pub use worker::{Worker, WorkerHandle, WorkerState};

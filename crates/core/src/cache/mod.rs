//! SQLite-backed named stores for cached responses.
//!
//! This module provides a persistent store system using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Any number of independently named stores in one database
//! - Entries keyed by a hash of the request identity, overwritten on write
//! - Whole-store deletion cascading to entries
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::{StoreHandle, StoreManager};

//! Store inspection MCP tools.
//!
//! Read-only views over the SQLite store system.

pub mod keys;
pub mod stores;

pub use keys::{CacheKeysParams, keys_impl};
pub use stores::stores_impl;

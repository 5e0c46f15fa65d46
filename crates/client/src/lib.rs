//! Network client for shellcache.
//!
//! This crate provides the HTTP implementation of the core `Network` trait
//! used by the strategy engine and the install step.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};

//! shellcache server entry point.
//!
//! Boots the interception layer and serves it as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig};
use shellcache_core::{AppConfig, CacheDb, StrategyEngine, Worker, WorkerHandle};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        store = %config.static_family().current(),
        "starting shellcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let engine = StrategyEngine::new(Arc::new(db.clone()), Arc::new(network)).with_timeout(config.timeout());
    let (worker, handle) = Worker::new(engine, config.worker_config()?)?;
    worker.spawn();

    boot(&handle).await;

    let server = handler::ShellcacheServer::new(handle, db);
    let running = serve_server(server, stdio()).await?;
    running.waiting().await?;

    Ok(())
}

/// Install then activate. A failed install leaves the worker parked and
/// requests pass straight through to the network.
async fn boot(handle: &WorkerHandle) {
    match handle.install().await {
        Ok(report) => tracing::info!(store = %report.store, entries = report.entries, "installed"),
        Err(e) => tracing::warn!(error = %e, "install failed, trying to reuse an existing static store"),
    }

    match handle.activate().await {
        Ok(report) => tracing::info!(current = %report.current, deleted = ?report.deleted, "activated"),
        Err(e) => tracing::warn!(error = %e, "activation failed, requests pass through"),
    }
}

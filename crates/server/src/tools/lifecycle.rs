//! install and activate tool implementations.
//!
//! Both run on the worker loop, so they never overlap with each other.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use shellcache_core::WorkerHandle;

use super::json_result;

/// Implementation of the install tool.
pub async fn install_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&report)
}

/// Implementation of the activate tool.
pub async fn activate_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}

//! cache_stores tool implementation.
//!
//! Lists every store name.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, StoreManager};

use crate::tools::json_result;

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    /// Store names, sorted.
    pub stores: Vec<String>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(db: &CacheDb) -> Result<CallToolResult, McpError> {
    let stores = db.list_names().await?;
    json_result(&CacheStoresOutput { stores })
}

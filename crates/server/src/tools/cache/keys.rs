//! cache_keys tool implementation.
//!
//! Lists the request keys held by one store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, Error, RequestIdentity, StoreManager};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// The store to list.
    pub store: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKeysOutput {
    pub store: String,
    /// Keys in insertion order.
    pub keys: Vec<RequestIdentity>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(db: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let handle = db
        .find(&params.store)
        .await?
        .ok_or_else(|| Error::InvalidInput(format!("unknown store: {}", params.store)))?;
    let keys = db.list_keys(&handle).await?;
    json_result(&CacheKeysOutput { store: params.store, keys })
}

//! post_message tool implementation.
//!
//! Queues a client message on the worker and returns without waiting for it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{ClientMessage, WorkerHandle};

use super::json_result;

/// Parameters for the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// The message object, e.g. `{"action": "cleanDerivedCache", "keys": ["https://..."]}`.
    pub message: serde_json::Value,
}

/// Output from the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageOutput {
    /// Whether the message was queued. Handling happens later and is not reported.
    pub accepted: bool,
}

/// Implementation of the post_message tool.
pub async fn post_message_impl(worker: &WorkerHandle, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let message = ClientMessage::from_json(params.message)?;
    let output = PostMessageOutput { accepted: worker.post_message(message) };
    json_result(&output)
}

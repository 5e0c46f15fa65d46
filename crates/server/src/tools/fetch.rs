//! fetch tool implementation.
//!
//! Sends a request through the worker, which picks a strategy by route.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CachedResponse, Error, Outcome, Request, RequestIdentity, ResponseSource, WorkerHandle};

use super::json_result;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute http(s) URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body, sent as UTF-8 text.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutput {
    /// "served" or "unavailable".
    pub outcome: String,
    /// Where the response came from, when one was served.
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    /// Body as text when it is valid UTF-8.
    pub body: Option<String>,
    /// Body as base64 when it is not.
    pub body_base64: Option<String>,
}

impl FetchOutput {
    fn unavailable() -> Self {
        Self {
            outcome: "unavailable".into(),
            source: None,
            status: None,
            headers: Vec::new(),
            body: None,
            body_base64: None,
        }
    }

    fn served(response: &CachedResponse, source: ResponseSource) -> Self {
        let (body, body_base64) = match std::str::from_utf8(&response.body) {
            Ok(text) => (Some(text.to_string()), None),
            Err(_) => (None, Some(STANDARD.encode(&response.body))),
        };
        Self {
            outcome: "served".into(),
            source: Some(source),
            status: Some(response.status),
            headers: response.headers.clone(),
            body,
            body_base64,
        }
    }
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &WorkerHandle, params: FetchParams) -> Result<CallToolResult, McpError> {
    if params.url.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let identity = RequestIdentity::new(&params.method, &params.url)?;
    let mut request = Request::new(identity);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let output = match worker.fetch(request).await? {
        Outcome::Served { response, source } => FetchOutput::served(&response, source),
        Outcome::Unavailable => FetchOutput::unavailable(),
    };

    json_result(&output)
}

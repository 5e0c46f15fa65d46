//! Intercepted requests, their cache identity, and cached responses.
//!
//! ### URL Canonicalization
//! - Trim whitespace, require an absolute `http`/`https` URL
//! - Lowercase host, remove fragments
//! - Preserve query string (it is part of the identity)

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::Error;

/// Canonicalize a URL string so equal resources produce equal identities.
pub fn canonicalize(input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// The store lookup key: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IdentityRepr")]
pub struct RequestIdentity {
    method: String,
    url: Url,
}

/// Wire shapes accepted for a retain-set entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdentityRepr {
    Url(String),
    Full {
        #[serde(default = "default_method")]
        method: String,
        url: String,
    },
}

fn default_method() -> String {
    "GET".into()
}

impl TryFrom<IdentityRepr> for RequestIdentity {
    type Error = Error;

    fn try_from(repr: IdentityRepr) -> Result<Self, Self::Error> {
        match repr {
            IdentityRepr::Url(url) => RequestIdentity::get(&url),
            IdentityRepr::Full { method, url } => RequestIdentity::new(&method, &url),
        }
    }
}

impl RequestIdentity {
    pub fn new(method: &str, url: &str) -> Result<Self, Error> {
        let method = method.trim().to_ascii_uppercase();
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(Error::InvalidInput(format!("invalid method: {method:?}")));
        }
        Ok(Self { method, url: canonicalize(url)? })
    }

    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url)
    }

    pub(crate) fn from_url(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An intercepted outbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub identity: RequestIdentity,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(identity: RequestIdentity) -> Self {
        Self { identity, body: None }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn url(&self) -> &Url {
        self.identity.url()
    }
}

/// A response as returned to the caller and as archived in a store.
///
/// Cloning shares the body buffer, so the same response can be handed back
/// and written to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mirrors the fetch `ok` flag: status in 200-299.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheDb, StoreHandle, StoreManager};
use crate::network::Network;
use crate::{CachedResponse, Error, Request, RequestIdentity};

/// Scripted network: known URLs answer with their response, everything else
/// (or everything, once offline) fails with `NetworkUnavailable`.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<HashMap<String, CachedResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: CachedResponse) {
        let url = crate::request::canonicalize(url).unwrap().to_string();
        self.responses.lock().unwrap().insert(url, response);
    }

    pub fn go_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self, url: &str) -> usize {
        let url = crate::request::canonicalize(url).unwrap().to_string();
        self.calls.lock().unwrap().get(&url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        let url = request.url().to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.offline.lock().unwrap() {
            return Err(Error::NetworkUnavailable(format!("offline: {url}")));
        }

        self.responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::NetworkUnavailable(format!("no route to {url}")))
    }
}

/// Store system whose writes always fail, as with an exhausted quota.
pub struct ReadOnlyStores {
    inner: CacheDb,
}

impl ReadOnlyStores {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner }
    }
}

fn quota_exceeded() -> Error {
    Error::StoreUnavailable(tokio_rusqlite::Error::ConnectionClosed)
}

#[async_trait]
impl StoreManager for ReadOnlyStores {
    async fn open(&self, name: &str) -> Result<StoreHandle, Error> {
        self.inner.open(name).await
    }

    async fn find(&self, name: &str) -> Result<Option<StoreHandle>, Error> {
        self.inner.find(name).await
    }

    async fn get(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<Option<CachedResponse>, Error> {
        self.inner.get(store, key).await
    }

    async fn put(&self, _store: &StoreHandle, _key: &RequestIdentity, _response: &CachedResponse) -> Result<(), Error> {
        Err(quota_exceeded())
    }

    async fn put_all(&self, _store: &StoreHandle, _entries: &[(RequestIdentity, CachedResponse)]) -> Result<(), Error> {
        Err(quota_exceeded())
    }

    async fn delete(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<bool, Error> {
        self.inner.delete(store, key).await
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.inner.list_names().await
    }

    async fn list_keys(&self, store: &StoreHandle) -> Result<Vec<RequestIdentity>, Error> {
        self.inner.list_keys(store).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_store(name).await
    }
}

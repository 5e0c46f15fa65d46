//! Versioned static store lifecycle.
//!
//! Install fills the store for the current version tag with the asset
//! manifest, all or nothing. Activate deletes every other store of the
//! static family and leaves derived stores alone.

use futures_util::future::try_join_all;
use serde::Serialize;
use url::Url;

use crate::cache::{StoreHandle, StoreManager};
use crate::strategy::StrategyEngine;
use crate::{Error, Request, RequestIdentity};

/// Naming scheme of the version-rotated stores: `<prefix><version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFamily {
    prefix: String,
    version: String,
}

impl StaticFamily {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the store for the current version.
    pub fn current(&self) -> String {
        format!("{}{}", self.prefix, self.version)
    }

    pub fn contains(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// A static-family store that is not the current one.
    pub fn is_stale(&self, name: &str) -> bool {
        self.contains(name) && name != self.current()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub store: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub current: String,
    pub deleted: Vec<String>,
}

/// Populate the current static store with every manifest asset.
///
/// All assets are fetched before anything is written, and the writes go in
/// as one batch that also creates the store. Any failed or non-OK fetch
/// fails the whole install with `ManifestFetchFailed`; a failed batch write
/// fails it with the store error. Either way no current store is left behind.
pub async fn install(engine: &StrategyEngine, family: &StaticFamily, manifest: &[Url]) -> Result<InstallReport, Error> {
    let store = family.current();
    tracing::info!(store = %store, assets = manifest.len(), "installing static store");

    let fetches = manifest.iter().map(|url| async move {
        let identity = RequestIdentity::get(url.as_str())?;
        let response = engine
            .fetch_network(&Request::new(identity.clone()))
            .await
            .map_err(|e| Error::ManifestFetchFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.is_ok() {
            return Err(Error::ManifestFetchFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status),
            });
        }
        Ok((identity, response))
    });

    let entries = try_join_all(fetches).await.inspect_err(|e| {
        tracing::error!(store = %store, error = %e, "install aborted");
    })?;

    let stores = engine.stores();
    let handle = StoreHandle::new(&store);
    stores.put_all(&handle, &entries).await.inspect_err(|e| {
        tracing::error!(store = %store, error = %e, "install aborted, static store not written");
    })?;

    let count = stores.list_keys(&handle).await?.len();
    tracing::info!(store = %store, entries = count, "static store installed");

    Ok(InstallReport { store, entries: count })
}

/// Delete every static-family store except the current one.
///
/// Deleting is idempotent, so an activation cut short can simply be run again.
pub async fn activate(stores: &dyn StoreManager, family: &StaticFamily) -> Result<ActivateReport, Error> {
    let current = family.current();
    let mut deleted = Vec::new();

    for name in stores.list_names().await? {
        if !family.is_stale(&name) {
            continue;
        }
        if stores.delete_store(&name).await? {
            tracing::info!(store = %name, current = %current, "deleted stale static store");
            deleted.push(name);
        }
    }

    Ok(ActivateReport { current, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CachedResponse;
    use crate::cache::CacheDb;
    use crate::testing::{FakeNetwork, ReadOnlyStores};
    use std::sync::Arc;

    const BASE: &str = "https://app.example.com/";

    fn manifest(paths: &[&str]) -> Vec<Url> {
        let base = Url::parse(BASE).unwrap();
        paths.iter().map(|p| base.join(p).unwrap()).collect()
    }

    fn shell_network() -> Arc<FakeNetwork> {
        let network = Arc::new(FakeNetwork::new());
        network.respond("https://app.example.com/shell.html", CachedResponse::new(200, "<html>"));
        network.respond("https://app.example.com/app.js", CachedResponse::new(200, "js"));
        network
    }

    async fn key_count(db: &CacheDb, store: &str) -> usize {
        match db.find(store).await.unwrap() {
            Some(handle) => db.list_keys(&handle).await.unwrap().len(),
            None => 0,
        }
    }

    #[test]
    fn test_static_family_naming() {
        let family = StaticFamily::new("static-", "1.1");
        assert_eq!(family.current(), "static-1.1");
        assert!(family.is_stale("static-1.0"));
        assert!(!family.is_stale("static-1.1"));
        assert!(!family.is_stale("pics"));
    }

    #[tokio::test]
    async fn test_install_populates_manifest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let engine = StrategyEngine::new(Arc::new(db.clone()), shell_network());
        let family = StaticFamily::new("static-", "1.0");

        let report = install(&engine, &family, &manifest(&["shell.html", "app.js"])).await.unwrap();
        assert_eq!(report, InstallReport { store: "static-1.0".into(), entries: 2 });
        assert_eq!(key_count(&db, "static-1.0").await, 2);
    }

    #[tokio::test]
    async fn test_install_twice_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let engine = StrategyEngine::new(Arc::new(db.clone()), shell_network());
        let family = StaticFamily::new("static-", "1.0");
        let assets = manifest(&["shell.html", "app.js"]);

        install(&engine, &family, &assets).await.unwrap();
        let report = install(&engine, &family, &assets).await.unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(db.list_names().await.unwrap(), vec!["static-1.0".to_string()]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = shell_network();
        network.respond("https://app.example.com/style.css", CachedResponse::new(500, "oops"));
        let engine = StrategyEngine::new(Arc::new(db.clone()), network);
        let family = StaticFamily::new("static-", "1.0");

        let result = install(&engine, &family, &manifest(&["shell.html", "app.js", "style.css"])).await;
        assert!(matches!(result, Err(Error::ManifestFetchFailed { url, .. }) if url.ends_with("style.css")));
        assert_eq!(key_count(&db, "static-1.0").await, 0);

        let result = install(&engine, &family, &manifest(&["shell.html", "missing.js"])).await;
        assert!(matches!(result, Err(Error::ManifestFetchFailed { .. })));
        assert_eq!(key_count(&db, "static-1.0").await, 0);
        assert!(db.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_store_failure_fails_install() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let engine = StrategyEngine::new(Arc::new(ReadOnlyStores::new(db.clone())), shell_network());
        let family = StaticFamily::new("static-", "1.0");

        let result = install(&engine, &family, &manifest(&["shell.html"])).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert!(db.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_version_bump_scenario() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let engine = StrategyEngine::new(Arc::new(db.clone()), shell_network());
        let assets = manifest(&["shell.html", "app.js"]);

        let pics = db.open("pics").await.unwrap();
        for i in 0..15 {
            let key = RequestIdentity::get(&format!("https://images.example.com/{i}")).unwrap();
            db.put(&pics, &key, &CachedResponse::new(200, format!("img-{i}"))).await.unwrap();
        }
        let pics_before = db.list_keys(&pics).await.unwrap();

        let v1 = StaticFamily::new("static-", "1.0");
        install(&engine, &v1, &assets).await.unwrap();
        activate(&db, &v1).await.unwrap();
        assert_eq!(key_count(&db, "static-1.0").await, 2);

        let v2 = StaticFamily::new("static-", "1.1");
        install(&engine, &v2, &assets).await.unwrap();
        let report = activate(&db, &v2).await.unwrap();

        assert_eq!(report, ActivateReport { current: "static-1.1".into(), deleted: vec!["static-1.0".into()] });
        assert_eq!(db.list_names().await.unwrap(), vec!["pics".to_string(), "static-1.1".to_string()]);
        assert_eq!(db.list_keys(&pics).await.unwrap(), pics_before);
        assert_eq!(key_count(&db, "static-1.1").await, 2);
    }

    #[tokio::test]
    async fn test_activate_removes_every_stale_version() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["static-0.8", "static-0.9", "static-1.0", "pics", "avatars"] {
            db.open(name).await.unwrap();
        }

        let report = activate(&db, &StaticFamily::new("static-", "1.0")).await.unwrap();
        assert_eq!(report.deleted, vec!["static-0.8".to_string(), "static-0.9".to_string()]);
        assert_eq!(db.list_names().await.unwrap(), vec![
            "avatars".to_string(),
            "pics".to_string(),
            "static-1.0".to_string()
        ]);
    }
}

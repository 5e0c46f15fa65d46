//! Client-driven pruning of the derived store.
//!
//! The client sends the set of resources it still needs; every entry of the
//! derived store outside that set is deleted. Delivery is fire-and-forget,
//! and a pass that races a concurrent write may evict a key that is fetched
//! again on next access.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cache::StoreManager;
use crate::{Error, RequestIdentity};

/// Messages a client process may post to the interception layer.
///
/// Unknown actions deserialize to [`ClientMessage::Unknown`] and are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "cleanDerivedCache")]
    CleanDerivedCache { keys: Vec<RequestIdentity> },
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn from_json(value: serde_json::Value) -> Result<Self, Error> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub store: String,
    pub scanned: usize,
    pub deleted: usize,
}

/// Delete every entry of `store` whose key is not in `retain`.
pub async fn collect_garbage(
    stores: &dyn StoreManager, store: &str, retain: &[RequestIdentity],
) -> Result<GcReport, Error> {
    let retain: HashSet<&RequestIdentity> = retain.iter().collect();
    let Some(handle) = stores.find(store).await? else {
        return Ok(GcReport { store: store.to_string(), scanned: 0, deleted: 0 });
    };
    let keys = stores.list_keys(&handle).await?;

    let mut deleted = 0;
    for key in &keys {
        if retain.contains(key) {
            continue;
        }
        if stores.delete(&handle, key).await? {
            deleted += 1;
        }
    }

    Ok(GcReport { store: store.to_string(), scanned: keys.len(), deleted })
}

/// Handle one client message against the derived store.
///
/// Failures are logged, never returned: the sender is not listening.
pub async fn handle_message(stores: &dyn StoreManager, derived_store: &str, message: &ClientMessage) {
    match message {
        ClientMessage::CleanDerivedCache { keys } => match collect_garbage(stores, derived_store, keys).await {
            Ok(report) => tracing::info!(
                store = %report.store,
                scanned = report.scanned,
                deleted = report.deleted,
                retained = keys.len(),
                "derived store reconciled"
            ),
            Err(e) => tracing::warn!(store = derived_store, error = %e, "derived store reconciliation failed"),
        },
        ClientMessage::Unknown => tracing::debug!("ignoring client message with unknown action"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CachedResponse;
    use crate::cache::CacheDb;

    fn key(name: &str) -> RequestIdentity {
        RequestIdentity::get(&format!("https://images.example.com/{name}")).unwrap()
    }

    async fn seeded(names: &[&str]) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        let pics = db.open("pics").await.unwrap();
        for name in names {
            db.put(&pics, &key(name), &CachedResponse::new(200, format!("body-{name}"))).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_gc_converges_to_retain_set() {
        let db = seeded(&["a", "b", "c", "d"]).await;

        let report = collect_garbage(&db, "pics", &[key("b"), key("c")]).await.unwrap();
        assert_eq!(report, GcReport { store: "pics".into(), scanned: 4, deleted: 2 });

        let pics = db.open("pics").await.unwrap();
        let mut remaining = db.list_keys(&pics).await.unwrap();
        remaining.sort_by(|a, b| a.url().as_str().cmp(b.url().as_str()));
        assert_eq!(remaining, vec![key("b"), key("c")]);
        assert_eq!(db.get(&pics, &key("b")).await.unwrap().unwrap().body, "body-b");
        assert_eq!(db.get(&pics, &key("c")).await.unwrap().unwrap().body, "body-c");
    }

    #[tokio::test]
    async fn test_gc_tolerates_duplicates_and_unknown_keys() {
        let db = seeded(&["a", "b"]).await;
        let retain = vec![key("b"), key("b"), key("zzz")];

        let report = collect_garbage(&db, "pics", &retain).await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_gc_empty_retain_set_clears_store_but_keeps_it() {
        let db = seeded(&["a", "b"]).await;

        collect_garbage(&db, "pics", &[]).await.unwrap();
        assert_eq!(db.list_names().await.unwrap(), vec!["pics".to_string()]);
        let pics = db.open("pics").await.unwrap();
        assert!(db.list_keys(&pics).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gc_leaves_other_stores_alone() {
        let db = seeded(&["a"]).await;
        let shell = db.open("static-1.0").await.unwrap();
        db.put(&shell, &key("a"), &CachedResponse::new(200, "x")).await.unwrap();

        collect_garbage(&db, "pics", &[]).await.unwrap();
        assert!(db.get(&shell, &key("a")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gc_on_missing_store_does_not_create_it() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let report = collect_garbage(&db, "pics", &[key("a")]).await.unwrap();
        assert_eq!(report, GcReport { store: "pics".into(), scanned: 0, deleted: 0 });
        assert!(db.list_names().await.unwrap().is_empty());
    }

    #[test]
    fn test_message_parsing() {
        let message = ClientMessage::from_json(serde_json::json!({
            "action": "cleanDerivedCache",
            "keys": ["https://images.example.com/b", {"url": "https://images.example.com/c"}]
        }))
        .unwrap();
        assert_eq!(message, ClientMessage::CleanDerivedCache { keys: vec![key("b"), key("c")] });

        let unknown = ClientMessage::from_json(serde_json::json!({ "action": "skipWaiting" })).unwrap();
        assert_eq!(unknown, ClientMessage::Unknown);

        assert!(ClientMessage::from_json(serde_json::json!({ "keys": [] })).is_err());
    }

    #[tokio::test]
    async fn test_handle_message_ignores_unknown_action() {
        let db = seeded(&["a", "b"]).await;

        handle_message(&db, "pics", &ClientMessage::Unknown).await;
        let pics = db.open("pics").await.unwrap();
        assert_eq!(db.list_keys(&pics).await.unwrap().len(), 2);

        handle_message(&db, "pics", &ClientMessage::CleanDerivedCache { keys: vec![key("a")] }).await;
        assert_eq!(db.list_keys(&pics).await.unwrap(), vec![key("a")]);
    }
}

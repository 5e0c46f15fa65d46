//! Named stores of cached responses.
//!
//! `StoreManager` is the store collaborator every component is handed
//! explicitly; `CacheDb` implements it on SQLite.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use url::Url;

use super::connection::CacheDb;
use super::hash::entry_key;
use crate::{CachedResponse, Error, RequestIdentity};

/// An opened store. Only names a store; holds no connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    name: String,
}

impl StoreHandle {
    /// Name a store without touching it. Writing through the handle creates the store.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Operations over the set of named stores.
///
/// Every call may suspend. Writing an existing key overwrites it.
#[async_trait]
pub trait StoreManager: Send + Sync {
    /// Create the store if absent and return a handle to it.
    async fn open(&self, name: &str) -> Result<StoreHandle, Error>;

    /// Return a handle only if the store already exists. Never creates it.
    async fn find(&self, name: &str) -> Result<Option<StoreHandle>, Error>;

    async fn get(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<Option<CachedResponse>, Error>;

    async fn put(&self, store: &StoreHandle, key: &RequestIdentity, response: &CachedResponse) -> Result<(), Error>;

    /// Write several entries, creating the store if absent.
    ///
    /// Implementations should make this atomic, store creation included, so
    /// a failed batch leaves no trace.
    async fn put_all(&self, store: &StoreHandle, entries: &[(RequestIdentity, CachedResponse)]) -> Result<(), Error> {
        for (key, response) in entries {
            self.put(store, key, response).await?;
        }
        Ok(())
    }

    /// Delete one entry. Returns whether it existed.
    async fn delete(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<bool, Error>;

    async fn list_names(&self) -> Result<Vec<String>, Error>;

    async fn list_keys(&self, store: &StoreHandle) -> Result<Vec<RequestIdentity>, Error>;

    /// Delete a store with all its entries. Returns whether it existed.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;
}

fn insert_entry(
    conn: &rusqlite::Connection, store: &str, key: &RequestIdentity, response: &CachedResponse, stored_at: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
        params![store, stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(store, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            entry_key(key),
            key.method(),
            key.url().as_str(),
            response.status as i64,
            headers_json,
            &response.body[..],
            stored_at,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl StoreManager for CacheDb {
    async fn open(&self, name: &str) -> Result<StoreHandle, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("store name cannot be empty".into()));
        }
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;
        Ok(StoreHandle::new(name))
    }

    async fn find(&self, name: &str) -> Result<Option<StoreHandle>, Error> {
        let owned = name.to_string();
        let exists = self
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
                    params![owned],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)?;
        Ok(exists.then(|| StoreHandle::new(name)))
    }

    async fn get(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<Option<CachedResponse>, Error> {
        let store = store.name.clone();
        let key_hash = entry_key(key);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE store = ?1 AND key_hash = ?2",
                        params![store, key_hash],
                        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;

                match row {
                    Some((status, headers_json, body)) => Ok(Some(CachedResponse {
                        status: status as u16,
                        headers: serde_json::from_str(&headers_json)?,
                        body: Bytes::from(body),
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, store: &StoreHandle, key: &RequestIdentity, response: &CachedResponse) -> Result<(), Error> {
        let store = store.name.clone();
        let key = key.clone();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| insert_entry(conn, &store, &key, &response, &now))
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, store: &StoreHandle, entries: &[(RequestIdentity, CachedResponse)]) -> Result<(), Error> {
        let store = store.name.clone();
        let entries = entries.to_vec();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                for (key, response) in &entries {
                    insert_entry(&tx, &store, key, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, store: &StoreHandle, key: &RequestIdentity) -> Result<bool, Error> {
        let store = store.name.clone();
        let key_hash = entry_key(key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_keys(&self, store: &StoreHandle) -> Result<Vec<RequestIdentity>, Error> {
        let store = store.name.clone();
        self.conn
            .call(move |conn| -> Result<Vec<RequestIdentity>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE store = ?1 ORDER BY stored_at, url")?;
                let rows = stmt
                    .query_map(params![store], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(method, url)| {
                        let url = Url::parse(&url).map_err(|e| Error::InvalidUrl(format!("stored url {url}: {e}")))?;
                        Ok(RequestIdentity::from_url(&method, url))
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

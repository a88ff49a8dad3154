//! Cache Storage
//!
//! SQLite key/value store for JSON payloads (news headlines, market analysis).

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::storage::{open_file, StoreError};
use crate::tiered_cache::{CachedEntry, PersistentTier};

/// JSON payload store, one row per write
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        Self::with_connection(open_file(db_path)?)
    }

    /// Create an in-memory store (useful for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                cache_date TEXT NOT NULL,
                payload JSON NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_kind
            ON cache_entries(kind, created_at DESC);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Store a raw JSON payload
    pub fn save(
        &self,
        kind: &str,
        payload: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cache_entries (kind, cache_date, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                kind,
                captured_at.format("%Y-%m-%d").to_string(),
                payload,
                captured_at.timestamp_millis(),
            ],
        )?;

        debug!("Stored {} cache entry", kind);
        Ok(conn.last_insert_rowid())
    }

    /// Latest raw payload for `kind` captured at or after `newer_than`
    pub fn latest(
        &self,
        kind: &str,
        newer_than: DateTime<Utc>,
    ) -> Result<Option<(String, DateTime<Utc>)>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT payload, created_at FROM cache_entries
                 WHERE kind = ?1 AND created_at >= ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                params![kind, newer_than.timestamp_millis()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        row.map(|(payload, millis)| {
            DateTime::from_timestamp_millis(millis)
                .map(|at| (payload, at))
                .ok_or_else(|| StoreError::Malformed(format!("invalid created_at {}", millis)))
        })
        .transpose()
    }

    /// Payloads stored for a given UTC day (`YYYY-MM-DD`)
    #[cfg(test)]
    fn count_for_date(&self, kind: &str, cache_date: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE kind = ?1 AND cache_date = ?2",
            params![kind, cache_date],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Typed view over `CacheStore` for one payload type
pub struct JsonTier<T> {
    store: Arc<CacheStore>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonTier<T> {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PersistentTier<T> for JsonTier<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load_latest(
        &self,
        key: &str,
        newer_than: DateTime<Utc>,
    ) -> Result<Option<CachedEntry<T>>, StoreError> {
        match self.store.latest(key, newer_than)? {
            Some((payload, captured_at)) => {
                let payload = serde_json::from_str(&payload)?;
                Ok(Some(CachedEntry::at(payload, captured_at)))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, entry: &CachedEntry<T>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&entry.payload)?;
        self.store.save(key, &payload, entry.captured_at)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_latest_respects_cutoff() {
        let store = CacheStore::new_in_memory().unwrap();
        let now = Utc::now();

        store.save("news", "[1]", now - Duration::hours(2)).unwrap();
        store.save("news", "[2]", now - Duration::minutes(5)).unwrap();
        store.save("analysis", "{}", now).unwrap();

        let (payload, _) = store
            .latest("news", now - Duration::minutes(30))
            .unwrap()
            .unwrap();
        assert_eq!(payload, "[2]");

        assert!(store.latest("news", now + Duration::minutes(1)).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_tier_round_trip() {
        let store = Arc::new(CacheStore::new_in_memory().unwrap());
        let tier: JsonTier<Vec<String>> = JsonTier::new(store.clone());
        let captured_at = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();

        let entry = CachedEntry::at(vec!["a".to_string(), "b".to_string()], captured_at);
        tier.store("news", &entry).await.unwrap();

        let loaded = tier
            .load_latest("news", captured_at - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(loaded, Some(entry));
        assert_eq!(
            store
                .count_for_date("news", &captured_at.format("%Y-%m-%d").to_string())
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let store = Arc::new(CacheStore::new_in_memory().unwrap());
        store.save("news", "not json", Utc::now()).unwrap();

        let tier: JsonTier<Vec<String>> = JsonTier::new(store);
        let result = tier
            .load_latest("news", Utc::now() - Duration::minutes(1))
            .await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}

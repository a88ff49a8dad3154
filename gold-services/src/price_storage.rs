//! Price Storage
//!
//! SQLite table of flat price records, one row per persisted snapshot.
//! Columns for instruments added after the table was created are added on
//! open, so old rows read back with zero for new fields.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gold_core::{MarketSnapshot, SnapshotSource};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::price_record::{all_field_names, PriceRecord, PriceRecordCodec};
use crate::storage::{open_file, StoreError};
use crate::tiered_cache::{CachedEntry, PersistentTier};

/// Snapshot store backed by the `gold_prices` table
pub struct PriceStore {
    conn: Mutex<Connection>,
}

impl PriceStore {
    /// Open (or create) the store at `db_path`
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
            CREATE TABLE IF NOT EXISTS gold_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_gold_prices_created
            ON gold_prices(created_at);
            "#,
        )?;

        let added = ensure_columns(&conn)?;
        if added > 0 {
            info!("Added {} price columns to gold_prices", added);
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert one snapshot, returning its row id
    pub fn insert_snapshot(&self, snapshot: &MarketSnapshot) -> Result<i64, StoreError> {
        let record = PriceRecordCodec::to_record(snapshot);

        let mut columns = vec!["source".to_string(), "created_at".to_string()];
        let mut values = vec![
            Value::Text(record.source.label().to_string()),
            Value::Integer(record.captured_at.timestamp_millis()),
        ];
        for (name, value) in &record.fields {
            columns.push(name.clone());
            values.push(Value::Text(value.to_string()));
        }

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO gold_prices ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(values.iter()))?;
        let id = conn.last_insert_rowid();

        debug!("Stored price snapshot {} ({} fields)", id, record.fields.len());
        Ok(id)
    }

    /// Newest snapshot captured at or after `newer_than`
    pub fn latest_within(
        &self,
        newer_than: DateTime<Utc>,
    ) -> Result<Option<MarketSnapshot>, StoreError> {
        let records = self.query_records(
            "SELECT * FROM gold_prices WHERE created_at >= ?1
             ORDER BY created_at DESC, id DESC LIMIT 1",
            params![newer_than.timestamp_millis()],
        )?;
        Ok(records.first().map(PriceRecordCodec::from_record))
    }

    /// Snapshots captured in `[from, to]`, oldest first
    pub fn select_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MarketSnapshot>, StoreError> {
        let records = self.query_records(
            "SELECT * FROM gold_prices WHERE created_at >= ?1 AND created_at <= ?2
             ORDER BY created_at ASC, id ASC",
            params![from.timestamp_millis(), to.timestamp_millis()],
        )?;
        Ok(records.iter().map(PriceRecordCodec::from_record).collect())
    }

    /// Snapshot captured closest to `target`, at most `tolerance` away
    pub fn nearest_to(
        &self,
        target: DateTime<Utc>,
        tolerance: chrono::Duration,
    ) -> Result<Option<MarketSnapshot>, StoreError> {
        let target_ms = target.timestamp_millis();
        let tolerance_ms = tolerance.num_milliseconds();
        let records = self.query_records(
            "SELECT * FROM gold_prices WHERE created_at BETWEEN ?1 AND ?2
             ORDER BY ABS(created_at - ?3) ASC, id DESC LIMIT 1",
            params![target_ms - tolerance_ms, target_ms + tolerance_ms, target_ms],
        )?;
        Ok(records.first().map(PriceRecordCodec::from_record))
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM gold_prices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let rows = stmt.query_map(params, |row| Ok(read_record(row, &columns)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }
}

/// Decode a row into a flat record. Unparseable price fields read as zero.
fn read_record(row: &Row<'_>, columns: &[String]) -> Result<PriceRecord, StoreError> {
    let mut source = SnapshotSource::Live;
    let mut captured_at = None;
    let mut fields = BTreeMap::new();

    for (idx, name) in columns.iter().enumerate() {
        match name.as_str() {
            "id" => {}
            "source" => {
                let label: String = row.get(idx)?;
                source = SnapshotSource::from_str(&label).unwrap_or(SnapshotSource::Live);
            }
            "created_at" => {
                let millis: i64 = row.get(idx)?;
                captured_at = DateTime::from_timestamp_millis(millis);
            }
            field => {
                let text: Option<String> = row.get(idx)?;
                let value = text
                    .and_then(|t| Decimal::from_str(t.trim()).ok())
                    .unwrap_or(Decimal::ZERO);
                fields.insert(field.to_string(), value);
            }
        }
    }

    let captured_at =
        captured_at.ok_or_else(|| StoreError::Malformed("missing created_at".to_string()))?;

    Ok(PriceRecord {
        captured_at,
        source,
        fields,
    })
}

/// Add a TEXT column for every known price field the table lacks
fn ensure_columns(conn: &Connection) -> Result<usize, StoreError> {
    let existing: HashSet<String> = {
        let mut stmt = conn.prepare("PRAGMA table_info(gold_prices)")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        names.collect::<Result<_, _>>()?
    };

    let mut added = 0;
    for name in all_field_names() {
        if existing.contains(&name) {
            continue;
        }
        conn.execute(
            &format!("ALTER TABLE gold_prices ADD COLUMN {} TEXT NOT NULL DEFAULT '0'", name),
            [],
        )?;
        added += 1;
    }
    Ok(added)
}

/// The price table holds a single data kind, so the cache key is not stored
#[async_trait]
impl PersistentTier<MarketSnapshot> for PriceStore {
    async fn load_latest(
        &self,
        _key: &str,
        newer_than: DateTime<Utc>,
    ) -> Result<Option<CachedEntry<MarketSnapshot>>, StoreError> {
        Ok(self
            .latest_within(newer_than)?
            .map(|snapshot| {
                let captured_at = snapshot.captured_at;
                CachedEntry::at(snapshot, captured_at)
            }))
    }

    async fn store(
        &self,
        _key: &str,
        entry: &CachedEntry<MarketSnapshot>,
    ) -> Result<(), StoreError> {
        self.insert_snapshot(&entry.payload)?;
        Ok(())
    }
}

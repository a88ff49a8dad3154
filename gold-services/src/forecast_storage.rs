//! Forecast Storage
//!
//! SQLite store for AI forecast records. The accuracy columns are written
//! at most once per record.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gold_core::{ForecastPoint, ForecastRecord, Horizon, ObservedPoint};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::storage::{open_file, StoreError};

const SELECT_COLUMNS: &str = "id, made_at, horizon, reference_price, trend_label, confidence, \
     summary, forecast_curve, observed_curve, accuracy_score, source";

/// Aggregate accuracy figures for one horizon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HorizonStats {
    pub horizon: Horizon,
    pub total: usize,
    pub scored: usize,
    /// Mean accuracy of scored records, 2 dp
    pub average_accuracy: Option<Decimal>,
}

/// Forecast record store
pub struct ForecastStore {
    conn: Mutex<Connection>,
}

impl ForecastStore {
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
            CREATE TABLE IF NOT EXISTS forecasts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                made_at INTEGER NOT NULL,
                horizon TEXT NOT NULL,
                reference_price TEXT NOT NULL,
                trend_label TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                summary TEXT NOT NULL,
                forecast_curve JSON NOT NULL,
                observed_curve JSON,
                accuracy_score TEXT,
                source TEXT NOT NULL,
                last_target_at INTEGER,
                scored_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_forecasts_horizon
            ON forecasts(horizon, made_at DESC);

            CREATE INDEX IF NOT EXISTS idx_forecasts_pending
            ON forecasts(last_target_at) WHERE accuracy_score IS NULL;
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new forecast, returning its id
    pub fn insert(&self, record: &ForecastRecord) -> Result<i64, StoreError> {
        let forecast_curve = serde_json::to_string(&record.forecast_curve)?;
        let observed_curve = record
            .observed_curve
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO forecasts (made_at, horizon, reference_price, trend_label, confidence,
                                   summary, forecast_curve, observed_curve, accuracy_score,
                                   source, last_target_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.made_at.timestamp_millis(),
                record.horizon.as_str(),
                record.reference_price.to_string(),
                record.trend_label,
                record.confidence,
                record.summary,
                forecast_curve,
                observed_curve,
                record.accuracy_score.map(|s| s.to_string()),
                record.source,
                record.last_target().map(|t| t.timestamp_millis()),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Stored {} forecast {}", record.horizon, id);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<ForecastRecord>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM forecasts WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                |row| Ok(read_forecast(row)),
            )
            .optional()?;
        row.transpose()
    }

    /// Most recent forecasts for a horizon, newest first
    pub fn recent(&self, horizon: Horizon, limit: usize) -> Result<Vec<ForecastRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {} FROM forecasts WHERE horizon = ?1 ORDER BY made_at DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            params![horizon.as_str(), limit as i64],
        )
    }

    /// Unscored forecasts whose last target time is at or before `now`
    pub fn pending_due(&self, now: DateTime<Utc>) -> Result<Vec<ForecastRecord>, StoreError> {
        self.query(
            &format!(
                "SELECT {} FROM forecasts
                 WHERE accuracy_score IS NULL AND last_target_at IS NOT NULL AND last_target_at <= ?1
                 ORDER BY made_at ASC",
                SELECT_COLUMNS
            ),
            params![now.timestamp_millis()],
        )
    }

    /// Record the observed curve and score. Returns false when the record
    /// is unknown or was already scored.
    pub fn update_accuracy(
        &self,
        id: i64,
        observed: &[ObservedPoint],
        score: Decimal,
    ) -> Result<bool, StoreError> {
        let observed_curve = serde_json::to_string(observed)?;
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE forecasts SET observed_curve = ?1, accuracy_score = ?2, scored_at = ?3
             WHERE id = ?4 AND accuracy_score IS NULL",
            params![
                observed_curve,
                score.to_string(),
                Utc::now().timestamp_millis(),
                id
            ],
        )?;
        Ok(updated == 1)
    }

    /// Per-horizon totals, always one entry per horizon
    pub fn stats(&self) -> Result<Vec<HorizonStats>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT horizon, accuracy_score FROM forecasts")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut totals: Vec<(Horizon, usize, Vec<Decimal>)> =
            Horizon::ALL.iter().map(|h| (*h, 0, Vec::new())).collect();

        for row in rows {
            let (horizon, score) = row?;
            let Some(slot) = totals
                .iter_mut()
                .find(|(h, _, _)| Horizon::from_str(&horizon) == Some(*h))
            else {
                continue;
            };
            slot.1 += 1;
            if let Some(score) = score.and_then(|s| Decimal::from_str(&s).ok()) {
                slot.2.push(score);
            }
        }

        Ok(totals
            .into_iter()
            .map(|(horizon, total, scores)| {
                let average_accuracy = (!scores.is_empty()).then(|| {
                    let sum: Decimal = scores.iter().copied().sum();
                    (sum / Decimal::from(scores.len())).round_dp(2)
                });
                HorizonStats {
                    horizon,
                    total,
                    scored: scores.len(),
                    average_accuracy,
                }
            })
            .collect())
    }

    fn query<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<ForecastRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| Ok(read_forecast(row)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }
}

fn read_forecast(row: &Row<'_>) -> Result<ForecastRecord, StoreError> {
    let made_at: i64 = row.get(1)?;
    let horizon: String = row.get(2)?;
    let reference_price: String = row.get(3)?;
    let forecast_curve: String = row.get(7)?;
    let observed_curve: Option<String> = row.get(8)?;
    let accuracy_score: Option<String> = row.get(9)?;

    let made_at = DateTime::from_timestamp_millis(made_at)
        .ok_or_else(|| StoreError::Malformed(format!("invalid made_at {}", made_at)))?;
    let horizon = Horizon::from_str(&horizon)
        .ok_or_else(|| StoreError::Malformed(format!("unknown horizon {}", horizon)))?;
    let reference_price = parse_decimal(&reference_price)?;
    let forecast_curve: Vec<ForecastPoint> = serde_json::from_str(&forecast_curve)?;
    let observed_curve: Option<Vec<ObservedPoint>> = observed_curve
        .map(|json| serde_json::from_str(&json))
        .transpose()?;
    let accuracy_score = accuracy_score.map(|s| parse_decimal(&s)).transpose()?;

    Ok(ForecastRecord {
        id: row.get(0)?,
        made_at,
        horizon,
        reference_price,
        trend_label: row.get(4)?,
        confidence: row.get(5)?,
        summary: row.get(6)?,
        forecast_curve,
        observed_curve,
        accuracy_score,
        source: row.get(10)?,
    })
}

fn parse_decimal(text: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(text).map_err(|e| StoreError::Malformed(format!("{}: {}", text, e)))
}

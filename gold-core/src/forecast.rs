//! Forecast records produced by the analysis generator and scored later

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Forecast horizon / historical window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "1m")]
    Month,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Day, Horizon::Week, Horizon::Month];

    pub fn duration(&self) -> Duration {
        match self {
            Horizon::Day => Duration::hours(24),
            Horizon::Week => Duration::days(7),
            Horizon::Month => Duration::days(30),
        }
    }

    /// Start of this window counted back from `now`
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "24h" => Some(Horizon::Day),
            "7d" => Some(Horizon::Week),
            "1m" => Some(Horizon::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Day => "24h",
            Horizon::Week => "7d",
            Horizon::Month => "1m",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One predicted price on a forecast curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Time label used to align with the observed curve (e.g. "+6h")
    pub label: String,
    /// Instant the prediction refers to
    pub target_at: DateTime<Utc>,
    pub price: Decimal,
}

/// One actual price recorded for a forecast point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedPoint {
    pub label: String,
    pub observed_at: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastStatus {
    /// No observed curve yet
    Pending,
    /// Observed curve and accuracy score recorded (final)
    Scored,
}

/// An AI-generated price forecast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// Store-assigned id, zero before the record is persisted
    pub id: i64,
    pub made_at: DateTime<Utc>,
    pub horizon: Horizon,
    /// Primary instrument price when the forecast was made
    pub reference_price: Decimal,
    pub trend_label: String,
    /// Generator confidence, 0-100
    pub confidence: u8,
    /// Free-text forecast summary
    pub summary: String,
    pub forecast_curve: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_curve: Option<Vec<ObservedPoint>>,
    /// Set exactly when `observed_curve` is set and non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_score: Option<Decimal>,
    /// Which generator produced the forecast
    pub source: String,
}

impl ForecastRecord {
    /// A new pending forecast
    pub fn pending(
        horizon: Horizon,
        reference_price: Decimal,
        trend_label: impl Into<String>,
        confidence: u8,
        summary: impl Into<String>,
        forecast_curve: Vec<ForecastPoint>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            made_at: Utc::now(),
            horizon,
            reference_price,
            trend_label: trend_label.into(),
            confidence: confidence.min(100),
            summary: summary.into(),
            forecast_curve,
            observed_curve: None,
            accuracy_score: None,
            source: source.into(),
        }
    }

    pub fn status(&self) -> ForecastStatus {
        if self.accuracy_score.is_some() {
            ForecastStatus::Scored
        } else {
            ForecastStatus::Pending
        }
    }

    /// Latest target instant on the forecast curve
    pub fn last_target(&self) -> Option<DateTime<Utc>> {
        self.forecast_curve.iter().map(|p| p.target_at).max()
    }

    /// Whether every forecast point lies in the past
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last_target().is_some_and(|last| last <= now)
    }
}

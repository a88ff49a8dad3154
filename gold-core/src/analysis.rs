//! Market analysis produced by the analysis generator

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::forecast::ForecastPoint;

/// Short-term direction of the primary instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Up,
    Down,
    Sideways,
}

impl MarketTrend {
    /// Derive the trend from a daily change percentage (±0.1% dead band)
    pub fn from_change_percent(change_percent: Decimal) -> Self {
        let band = Decimal::new(1, 1);
        if change_percent > band {
            MarketTrend::Up
        } else if change_percent < -band {
            MarketTrend::Down
        } else {
            MarketTrend::Sideways
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketTrend::Up => "up",
            MarketTrend::Down => "down",
            MarketTrend::Sideways => "sideways",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorImpact {
    Positive,
    Negative,
    Neutral,
}

/// A single driver named in the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFactor {
    pub factor: String,
    pub impact: FactorImpact,
    /// Relative weight, 0-100
    pub weight: u8,
}

/// Analysis object returned by the generator and cached by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    /// Trend label as worded by the generator
    pub trend: String,
    /// Confidence, 0-100
    pub confidence: u8,
    pub summary: String,
    #[serde(default)]
    pub factors: Vec<AnalysisFactor>,
    #[serde(default)]
    pub forecast_curve: Vec<ForecastPoint>,
    pub risk_level: String,
    pub generated_at: DateTime<Utc>,
}

//! JSON presentation of domain types
//!
//! Domain values keep exact decimals; prices are rounded to 2 dp here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gold_core::{
    AnalysisFactor, FactorImpact, ForecastPoint, ForecastRecord, ForecastStatus, Headline,
    MarketAnalysis, MarketSnapshot, ObservedPoint, PriceQuote,
};
use gold_services::{HistoricalSeries, HorizonStats};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

pub fn money(value: Decimal) -> f64 {
    round_to(value, 2)
}

/// Exchange rates carry four places on the source page
fn rate(value: Decimal) -> f64 {
    round_to(value, 4)
}

fn round_to(value: Decimal, dp: u32) -> f64 {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub name: &'static str,
    pub buy: f64,
    pub sell: f64,
    pub change: f64,
    pub change_percent: f64,
}

impl From<&PriceQuote> for QuoteView {
    fn from(quote: &PriceQuote) -> Self {
        let price = if quote.kind.is_currency() { rate } else { money };
        Self {
            name: quote.kind.display_name(),
            buy: price(quote.buy),
            sell: price(quote.sell),
            change: price(quote.change),
            change_percent: money(quote.change_percent),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    /// Primary instrument sell price
    pub current: f64,
    pub quotes: BTreeMap<&'static str, QuoteView>,
    pub source: &'static str,
    pub degraded: bool,
    pub last_update: DateTime<Utc>,
}

impl From<&MarketSnapshot> for SnapshotView {
    fn from(snapshot: &MarketSnapshot) -> Self {
        Self {
            current: money(snapshot.primary().sell),
            quotes: snapshot
                .quotes
                .iter()
                .map(|(kind, quote)| (kind.key(), QuoteView::from(quote)))
                .collect(),
            source: snapshot.source.label(),
            degraded: snapshot.source.is_degraded(),
            last_update: snapshot.captured_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SeriesPointView {
    pub time: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatsView {
    pub high: f64,
    pub low: f64,
    pub average: f64,
    pub volatility: f64,
    pub data_points: usize,
}

pub fn series_views(series: &HistoricalSeries) -> (Vec<SeriesPointView>, SeriesStatsView) {
    let points = series
        .points
        .iter()
        .map(|p| SeriesPointView {
            time: p.at,
            price: money(p.price),
        })
        .collect();

    let stats = SeriesStatsView {
        high: money(series.stats.high),
        low: money(series.stats.low),
        average: money(series.stats.average),
        volatility: money(series.stats.volatility_percent),
        data_points: series.stats.data_points,
    };

    (points, stats)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineView {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

impl From<Headline> for HeadlineView {
    fn from(h: Headline) -> Self {
        Self {
            title: h.title,
            description: h.description,
            url: h.url,
            published_at: h.published_at,
            source_name: h.source_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FactorView {
    pub factor: String,
    pub impact: FactorImpact,
    pub weight: u8,
}

impl From<&AnalysisFactor> for FactorView {
    fn from(f: &AnalysisFactor) -> Self {
        Self {
            factor: f.factor.clone(),
            impact: f.impact,
            weight: f.weight,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePointView {
    pub label: String,
    pub at: DateTime<Utc>,
    pub price: f64,
}

impl From<&ForecastPoint> for CurvePointView {
    fn from(p: &ForecastPoint) -> Self {
        Self {
            label: p.label.clone(),
            at: p.target_at,
            price: money(p.price),
        }
    }
}

impl From<&ObservedPoint> for CurvePointView {
    fn from(p: &ObservedPoint) -> Self {
        Self {
            label: p.label.clone(),
            at: p.observed_at,
            price: money(p.price),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub trend: String,
    pub confidence: u8,
    pub summary: String,
    pub factors: Vec<FactorView>,
    pub forecast_curve: Vec<CurvePointView>,
    pub risk_level: String,
    pub generated_at: DateTime<Utc>,
}

impl From<&MarketAnalysis> for AnalysisView {
    fn from(a: &MarketAnalysis) -> Self {
        Self {
            trend: a.trend.clone(),
            confidence: a.confidence,
            summary: a.summary.clone(),
            factors: a.factors.iter().map(FactorView::from).collect(),
            forecast_curve: a.forecast_curve.iter().map(CurvePointView::from).collect(),
            risk_level: a.risk_level.clone(),
            generated_at: a.generated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastView {
    pub id: i64,
    pub made_at: DateTime<Utc>,
    pub horizon: &'static str,
    pub reference_price: f64,
    pub trend: String,
    pub confidence: u8,
    pub summary: String,
    pub forecast_curve: Vec<CurvePointView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_curve: Option<Vec<CurvePointView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_score: Option<f64>,
    pub status: ForecastStatus,
    pub source: String,
}

impl From<&ForecastRecord> for ForecastView {
    fn from(r: &ForecastRecord) -> Self {
        Self {
            id: r.id,
            made_at: r.made_at,
            horizon: r.horizon.as_str(),
            reference_price: money(r.reference_price),
            trend: r.trend_label.clone(),
            confidence: r.confidence,
            summary: r.summary.clone(),
            forecast_curve: r.forecast_curve.iter().map(CurvePointView::from).collect(),
            observed_curve: r
                .observed_curve
                .as_ref()
                .map(|curve| curve.iter().map(CurvePointView::from).collect()),
            accuracy_score: r.accuracy_score.map(money),
            status: r.status(),
            source: r.source.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonStatsView {
    pub timeframe: &'static str,
    pub total: usize,
    pub scored: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_accuracy: Option<f64>,
}

impl From<&HorizonStats> for HorizonStatsView {
    fn from(s: &HorizonStats) -> Self {
        Self {
            timeframe: s.horizon.as_str(),
            total: s.total,
            scored: s.scored,
            average_accuracy: s.average_accuracy.map(money),
        }
    }
}

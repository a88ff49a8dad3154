//! Core types for the Gold Price Tracker
//!
//! This crate defines the shared data structures used across the tracker,
//! including instrument kinds, price snapshots, forecasts and news headlines.

pub mod analysis;
pub mod error;
pub mod forecast;
pub mod news;
pub mod price;

pub use analysis::{AnalysisFactor, FactorImpact, MarketAnalysis, MarketTrend};
pub use error::{GoldError, GoldResult};
pub use forecast::{ForecastPoint, ForecastRecord, ForecastStatus, Horizon, ObservedPoint};
pub use news::Headline;
pub use price::{CoinSubtype, InstrumentKind, Karat, MarketSnapshot, PriceQuote, SnapshotSource};

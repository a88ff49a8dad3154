//! Services for the Gold Price Tracker
//!
//! Persistence, tiered caching, the market data pipeline, news and analysis
//! caching, and forecast accuracy scoring.

pub mod accuracy;
pub mod analysis_service;
pub mod cache_storage;
pub mod forecast_storage;
pub mod market_data_service;
pub mod news_service;
pub mod price_record;
pub mod price_storage;
pub mod storage;
pub mod tiered_cache;

pub use accuracy::{score, EvaluatorConfig, PredictionAccuracyEvaluator, ScoreOutcome, SweepReport};
pub use analysis_service::{AnalysisReport, AnalysisService};
pub use cache_storage::{CacheStore, JsonTier};
pub use forecast_storage::{ForecastStore, HorizonStats};
pub use market_data_service::{
    HistoricalSeries, MarketDataConfig, MarketDataService, SeriesPoint, SeriesStats,
};
pub use news_service::{HeadlineBatch, NewsFeed, NewsService};
pub use price_record::{PriceRecord, PriceRecordCodec};
pub use price_storage::PriceStore;
pub use storage::StoreError;
pub use tiered_cache::{
    CacheLookup, CachePolicy, CachedEntry, PersistenceWarning, PersistentTier, ServedFrom,
    TieredCache,
};

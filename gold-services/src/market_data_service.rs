//! Market Data Service
//!
//! Answers "current prices" and "price history" requests on top of the
//! price page fetcher, the HTML extractor and a tiered snapshot cache.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gold_core::{GoldError, GoldResult, Horizon, MarketSnapshot, SnapshotSource};
use gold_scraper::{HtmlPriceExtractor, PageSource};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::price_storage::PriceStore;
use crate::tiered_cache::{CacheLookup, CachePolicy, CachedEntry, PersistentTier, ServedFrom, TieredCache};

const SNAPSHOT_KEY: &str = "gold_prices";

#[derive(Debug, Clone, Copy)]
pub struct MarketDataConfig {
    pub cache_policy: CachePolicy,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::prices(Duration::minutes(5)),
        }
    }
}

/// One point of the historical price series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub price: Decimal,
}

/// Summary statistics over a series window, rounded to 2 dp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeriesStats {
    pub high: Decimal,
    pub low: Decimal,
    pub average: Decimal,
    pub volatility_percent: Decimal,
    pub data_points: usize,
}

impl SeriesStats {
    /// Stats over `prices`; an empty slice yields all zeros
    pub fn from_prices(prices: &[Decimal]) -> Self {
        let (Some(high), Some(low)) = (prices.iter().max(), prices.iter().min()) else {
            return Self::default();
        };

        let sum: Decimal = prices.iter().copied().sum();
        let average = sum / Decimal::from(prices.len());
        let volatility_percent = if average.is_zero() {
            Decimal::ZERO
        } else {
            (*high - *low) / average * Decimal::ONE_HUNDRED
        };

        Self {
            high: high.round_dp(2),
            low: low.round_dp(2),
            average: average.round_dp(2),
            volatility_percent: volatility_percent.round_dp(2),
            data_points: prices.len(),
        }
    }
}

/// Primary-instrument price history over a window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalSeries {
    pub window: Horizon,
    pub points: Vec<SeriesPoint>,
    pub stats: SeriesStats,
}

/// Current and historical market prices
pub struct MarketDataService {
    source: Arc<dyn PageSource>,
    extractor: HtmlPriceExtractor,
    cache: TieredCache<MarketSnapshot>,
    history: Option<Arc<PriceStore>>,
}

impl MarketDataService {
    /// `store` backs both the persistent cache tier and the history queries
    pub fn new(
        source: Arc<dyn PageSource>,
        extractor: HtmlPriceExtractor,
        store: Option<Arc<PriceStore>>,
        config: MarketDataConfig,
    ) -> Self {
        let persistent = store
            .clone()
            .map(|s| s as Arc<dyn PersistentTier<MarketSnapshot>>);

        Self {
            source,
            extractor,
            cache: TieredCache::new("prices", config.cache_policy, persistent),
            history: store,
        }
    }

    /// Current snapshot. `force_refresh` skips both cache tiers.
    ///
    /// A failed live scrape falls back to the memory entry regardless of its
    /// age, labelled `DegradedFallback`. Without one the call fails with
    /// `ScrapeFailed`.
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, force_refresh: bool) -> GoldResult<MarketSnapshot> {
        if !force_refresh {
            if let CacheLookup::Hit { entry, from } = self.cache.get(SNAPSHOT_KEY).await {
                let source = match from {
                    ServedFrom::Persistent => SnapshotSource::PersistentCache,
                    _ => SnapshotSource::MemoryCache,
                };
                return Ok(entry.payload.with_source(source));
            }
        }

        match self.scrape().await {
            Ok(snapshot) => {
                let entry = CachedEntry::at(snapshot.clone(), snapshot.captured_at);
                self.cache.put(SNAPSHOT_KEY, entry).await;
                Ok(snapshot)
            }
            Err(e) => match self.cache.stale(SNAPSHOT_KEY) {
                Some(stale) => {
                    warn!(
                        error = %e,
                        age_secs = stale.age(Utc::now()).num_seconds(),
                        "Live scrape failed, serving stale snapshot"
                    );
                    Ok(stale.payload.with_source(SnapshotSource::DegradedFallback))
                }
                None => Err(e),
            },
        }
    }

    /// Primary-instrument prices persisted within `window`, oldest first
    #[instrument(skip(self))]
    pub async fn get_historical_series(&self, window: Horizon) -> GoldResult<HistoricalSeries> {
        let store = self
            .history
            .as_ref()
            .ok_or_else(|| GoldError::config("Database not configured"))?;

        let now = Utc::now();
        let snapshots = store.select_range(window.start_from(now), now)?;

        let points: Vec<SeriesPoint> = snapshots
            .iter()
            .map(|s| SeriesPoint {
                at: s.captured_at,
                price: s.primary().sell.round_dp(2),
            })
            .collect();
        let prices: Vec<Decimal> = points.iter().map(|p| p.price).collect();

        Ok(HistoricalSeries {
            window,
            stats: SeriesStats::from_prices(&prices),
            points,
        })
    }

    async fn scrape(&self) -> GoldResult<MarketSnapshot> {
        let html = self.source.fetch_page().await?;
        let snapshot = self.extractor.extract(&html);

        if !snapshot.is_valid() {
            return Err(GoldError::scrape_failed(
                "price page parsed without a gram gold price",
            ));
        }

        info!(
            gram_gold = %snapshot.primary().sell,
            "Scraped fresh price snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gold_core::InstrumentKind;
    use gold_scraper::ScrapeError;
    use rust_decimal_macros::dec;

    const PAGE: &str = r#"<html><body><table>
        <tr><td><a href="/gram-altin">Gram Altın</a></td><td>4.550,10</td><td>4.563,13</td><td>%0,27 (12,50)</td></tr>
    </table></body></html>"#;

    /// Page source that can be switched offline
    #[derive(Default)]
    struct FakeSource {
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self) -> Result<String, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(ScrapeError::Timeout(10));
            }
            Ok(PAGE.to_string())
        }
    }

    fn service(source: Arc<FakeSource>, store: Option<Arc<PriceStore>>) -> MarketDataService {
        MarketDataService::new(
            source,
            HtmlPriceExtractor::default(),
            store,
            MarketDataConfig::default(),
        )
    }

    #[test]
    fn test_volatility_math() {
        let stats = SeriesStats::from_prices(&[dec!(10), dec!(20), dec!(30)]);
        assert_eq!(stats.high, dec!(30));
        assert_eq!(stats.low, dec!(10));
        assert_eq!(stats.average, dec!(20));
        assert_eq!(stats.volatility_percent, dec!(100.0));
        assert_eq!(stats.data_points, 3);
    }

    #[test]
    fn test_stats_round_to_two_places() {
        let stats = SeriesStats::from_prices(&[dec!(4563.134), dec!(4570), dec!(4580.456)]);
        assert_eq!(stats.high, dec!(4580.46));
        assert_eq!(stats.average, dec!(4571.20));
        assert_eq!(stats.volatility_percent, dec!(0.38));
    }

    #[test]
    fn test_empty_stats_are_zero() {
        assert_eq!(SeriesStats::from_prices(&[]), SeriesStats::default());
    }

    #[tokio::test]
    async fn test_live_then_memory() {
        let source = Arc::new(FakeSource::default());
        let service = service(source.clone(), None);

        let first = service.get_snapshot(false).await.unwrap();
        assert_eq!(first.source, SnapshotSource::Live);
        assert_eq!(first.primary().sell, dec!(4563.13));

        let second = service.get_snapshot(false).await.unwrap();
        assert_eq!(second.source, SnapshotSource::MemoryCache);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        service.get_snapshot(true).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_scrape_serves_degraded_memory() {
        let source = Arc::new(FakeSource::default());
        let service = service(source.clone(), None);
        service.get_snapshot(false).await.unwrap();

        source.offline.store(true, Ordering::SeqCst);
        let snapshot = service.get_snapshot(true).await.unwrap();

        assert_eq!(snapshot.source, SnapshotSource::DegradedFallback);
        assert_eq!(snapshot.primary().sell, dec!(4563.13));
    }

    #[tokio::test]
    async fn test_failed_scrape_without_memory_fails() {
        let source = Arc::new(FakeSource::default());
        source.offline.store(true, Ordering::SeqCst);
        let service = service(source, None);

        assert!(matches!(
            service.get_snapshot(false).await,
            Err(GoldError::ScrapeFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_persistent_hit_labelled() {
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let source = Arc::new(FakeSource::default());
        service(source.clone(), Some(store.clone()))
            .get_snapshot(false)
            .await
            .unwrap();

        // A fresh service instance has an empty memory tier
        let restarted = service(source.clone(), Some(store));
        let snapshot = restarted.get_snapshot(false).await.unwrap();

        assert_eq!(snapshot.source, SnapshotSource::PersistentCache);
        assert_eq!(snapshot.quote(InstrumentKind::GramGold).change, dec!(12.50));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_historical_series_empty_window() {
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let service = service(Arc::new(FakeSource::default()), Some(store));

        let series = service.get_historical_series(Horizon::Week).await.unwrap();
        assert!(series.points.is_empty());
        assert_eq!(series.stats, SeriesStats::default());
    }

    #[tokio::test]
    async fn test_historical_series_requires_store() {
        let service = service(Arc::new(FakeSource::default()), None);
        assert!(matches!(
            service.get_historical_series(Horizon::Day).await,
            Err(GoldError::Config(_))
        ));
    }
}

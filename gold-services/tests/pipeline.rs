//! End-to-end pipeline: scrape -> normalize -> persist -> serve -> score

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gold_core::{
    CoinSubtype, ForecastPoint, GoldResult, Horizon, InstrumentKind, Karat, MarketAnalysis,
    MarketSnapshot, PriceQuote, SnapshotSource,
};
use gold_news::StaticHeadlines;
use gold_research::{AnalysisGenerator, AnalysisInput};
use gold_scraper::{HtmlPriceExtractor, PageSource, ScrapeError};
use gold_services::{
    AnalysisService, CachePolicy, CacheStore, EvaluatorConfig, ForecastStore, HeadlineBatch,
    JsonTier, MarketDataConfig, MarketDataService, NewsService, PersistentTier,
    PredictionAccuracyEvaluator, PriceStore, SweepReport, TieredCache,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const FIXTURE: &str = include_str!("fixtures/altin.html");

#[derive(Default)]
struct FixtureSource {
    offline: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch_page(&self) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ScrapeError::HttpStatus { status: 503 });
        }
        Ok(FIXTURE.to_string())
    }
}

/// Emits a two-point curve whose targets already lie in the past
struct BacktestGenerator;

#[async_trait]
impl AnalysisGenerator for BacktestGenerator {
    async fn generate(&self, input: &AnalysisInput) -> GoldResult<MarketAnalysis> {
        Ok(MarketAnalysis {
            trend: "Yatay".to_string(),
            confidence: 60,
            summary: format!("Gram altın {} TL", input.gram_gold.sell),
            factors: Vec::new(),
            forecast_curve: vec![
                ForecastPoint {
                    label: "-2h".to_string(),
                    target_at: input.as_of - Duration::hours(2),
                    price: dec!(4010),
                },
                ForecastPoint {
                    label: "-1h".to_string(),
                    target_at: input.as_of - Duration::hours(1),
                    price: dec!(3990),
                },
            ],
            risk_level: "Düşük".to_string(),
            generated_at: input.as_of,
        })
    }

    fn name(&self) -> &'static str {
        "backtest"
    }
}

fn market(source: Arc<FixtureSource>, store: Arc<PriceStore>) -> MarketDataService {
    MarketDataService::new(
        source,
        HtmlPriceExtractor::default(),
        Some(store),
        MarketDataConfig::default(),
    )
}

fn snapshot_at(at: DateTime<Utc>, gram_sell: Decimal) -> MarketSnapshot {
    let mut snapshot = MarketSnapshot::empty(at, SnapshotSource::Live);
    snapshot.set(PriceQuote {
        kind: InstrumentKind::GramGold,
        buy: gram_sell - dec!(10),
        sell: gram_sell,
        change: Decimal::ZERO,
        change_percent: Decimal::ZERO,
    });
    snapshot
}

#[tokio::test]
async fn test_fixture_page_normalizes_every_instrument() {
    let store = Arc::new(PriceStore::new_in_memory().unwrap());
    let source = Arc::new(FixtureSource::default());
    let service = market(source.clone(), store.clone());

    let snapshot = service.get_snapshot(false).await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Live);

    let gram = snapshot.quote(InstrumentKind::GramGold);
    assert_eq!(gram.buy, dec!(4550.10));
    assert_eq!(gram.sell, dec!(4563.13));
    assert_eq!(gram.change, dec!(12.50));
    assert_eq!(gram.change_percent, dec!(0.27));

    assert_eq!(snapshot.quote(InstrumentKind::GramPureGold).sell, dec!(4610.92));
    assert_eq!(snapshot.quote(InstrumentKind::OunceGold).change, dec!(-4.08));
    assert_eq!(
        snapshot
            .quote(InstrumentKind::Commemorative(CoinSubtype::Ikibucuk))
            .buy,
        dec!(74000.00)
    );
    assert_eq!(
        snapshot
            .quote(InstrumentKind::Commemorative(CoinSubtype::Cumhuriyet))
            .sell,
        dec!(30400.00)
    );
    assert_eq!(
        snapshot.quote(InstrumentKind::Bracelet(Karat::K18)).change_percent,
        dec!(-0.12)
    );

    let usd = snapshot.quote(InstrumentKind::UsdTry);
    assert_eq!(usd.sell, dec!(41.1457));
    assert_eq!(usd.buy, dec!(41.1357));
    assert_eq!(usd.change_percent, dec!(-0.05));

    // Silver is not a tracked instrument; the snapshot still carries exactly one quote per kind
    assert_eq!(snapshot.quotes.len(), InstrumentKind::ALL.len());
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_restart_serves_persisted_snapshot_then_degrades() {
    let store = Arc::new(PriceStore::new_in_memory().unwrap());
    let source = Arc::new(FixtureSource::default());
    market(source.clone(), store.clone())
        .get_snapshot(false)
        .await
        .unwrap();

    let restarted = market(source.clone(), store.clone());
    let persisted = restarted.get_snapshot(false).await.unwrap();
    assert_eq!(persisted.source, SnapshotSource::PersistentCache);
    assert_eq!(persisted.primary().sell, dec!(4563.13));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    // The persistent hit repopulated memory, so a failed forced refresh can degrade
    source.offline.store(true, Ordering::SeqCst);
    let degraded = restarted.get_snapshot(true).await.unwrap();
    assert_eq!(degraded.source, SnapshotSource::DegradedFallback);
    assert!(degraded.source.is_degraded());
    assert_eq!(degraded.primary().sell, dec!(4563.13));
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_history_window_and_stats() {
    let store = Arc::new(PriceStore::new_in_memory().unwrap());
    let now = Utc::now();

    store
        .insert_snapshot(&snapshot_at(now - Duration::days(3), dec!(4000)))
        .unwrap();
    store
        .insert_snapshot(&snapshot_at(now - Duration::hours(5), dec!(4400)))
        .unwrap();
    store
        .insert_snapshot(&snapshot_at(now - Duration::hours(1), dec!(4600)))
        .unwrap();

    let service = market(Arc::new(FixtureSource::default()), store);

    let day = service.get_historical_series(Horizon::Day).await.unwrap();
    assert_eq!(day.points.len(), 2);
    assert!(day.points[0].at < day.points[1].at);
    assert_eq!(day.stats.high, dec!(4600));
    assert_eq!(day.stats.low, dec!(4400));
    assert_eq!(day.stats.average, dec!(4500));
    assert_eq!(day.stats.volatility_percent, dec!(4.44));

    let week = service.get_historical_series(Horizon::Week).await.unwrap();
    assert_eq!(week.stats.data_points, 3);
    assert_eq!(week.points[0].price, dec!(4000));
}

#[tokio::test]
async fn test_analysis_records_forecast_and_sweep_scores_it() {
    let prices = Arc::new(PriceStore::new_in_memory().unwrap());
    let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
    let cache_store = Arc::new(CacheStore::new_in_memory().unwrap());

    let news_tier: Arc<dyn PersistentTier<HeadlineBatch>> =
        Arc::new(JsonTier::new(cache_store.clone()));
    let analysis_tier: Arc<dyn PersistentTier<MarketAnalysis>> =
        Arc::new(JsonTier::new(cache_store));

    let market = Arc::new(market(Arc::new(FixtureSource::default()), prices.clone()));
    let news = Arc::new(NewsService::new(
        Arc::new(StaticHeadlines),
        TieredCache::new("news", CachePolicy::news(), Some(news_tier)),
    ));
    let analysis = AnalysisService::new(
        Arc::new(BacktestGenerator),
        market,
        news,
        TieredCache::new("analysis", CachePolicy::analysis(), Some(analysis_tier)),
        Some(forecasts.clone()),
    );

    let report = analysis.get_analysis(false).await.unwrap();
    assert_eq!(report.source, "backtest");
    assert!(!report.degraded);

    // The persistent tier is consulted before memory
    let cached = analysis.get_analysis(false).await.unwrap();
    assert_eq!(cached.source, "persistent_cache");
    assert_eq!(cached.analysis, report.analysis);

    let pending = forecasts.recent(Horizon::Day, 10).unwrap();
    assert_eq!(pending.len(), 1);
    let record = &pending[0];
    assert_eq!(record.reference_price, dec!(4563.13));
    assert!(record.accuracy_score.is_none());

    for point in &record.forecast_curve {
        prices
            .insert_snapshot(&snapshot_at(point.target_at + Duration::minutes(5), dec!(4000)))
            .unwrap();
    }

    let evaluator =
        PredictionAccuracyEvaluator::new(forecasts.clone(), Some(prices), EvaluatorConfig::default());
    let sweep = evaluator.evaluate_due(Utc::now()).await.unwrap();
    assert_eq!(sweep, SweepReport { scored: 1, skipped: 0 });

    let scored = forecasts.get(record.id).unwrap().unwrap();
    assert_eq!(scored.accuracy_score, Some(dec!(75)));
    let observed = scored.observed_curve.unwrap();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].label, "-2h");
    assert_eq!(observed[1].price, dec!(4000));

    // Scored records drop out of the sweep
    let again = evaluator.evaluate_due(Utc::now()).await.unwrap();
    assert_eq!(again, SweepReport::default());
}

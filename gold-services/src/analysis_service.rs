//! Analysis Service
//!
//! Cached AI market analysis. Each freshly generated analysis that carries a
//! forecast curve is also stored as a pending 24h forecast for later scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gold_core::{ForecastRecord, GoldResult, Horizon, MarketAnalysis, MarketSnapshot};
use gold_research::{AnalysisGenerator, AnalysisInput};
use tracing::{info, warn};

use crate::forecast_storage::ForecastStore;
use crate::market_data_service::MarketDataService;
use crate::news_service::NewsService;
use crate::tiered_cache::{CachePolicy, ServedFrom, TieredCache};

const ANALYSIS_KEY: &str = "analysis";

/// Headlines passed to the generator
const PROMPT_HEADLINES: usize = 3;

/// Analysis as served to a caller
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub analysis: MarketAnalysis,
    /// Cache tier label, generator name for fresh results, or
    /// `memory_fallback` when served stale after a failure
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub degraded: bool,
}

pub struct AnalysisService {
    generator: Arc<dyn AnalysisGenerator>,
    market: Arc<MarketDataService>,
    news: Arc<NewsService>,
    cache: TieredCache<MarketAnalysis>,
    forecasts: Option<Arc<ForecastStore>>,
}

impl AnalysisService {
    pub fn new(
        generator: Arc<dyn AnalysisGenerator>,
        market: Arc<MarketDataService>,
        news: Arc<NewsService>,
        cache: TieredCache<MarketAnalysis>,
        forecasts: Option<Arc<ForecastStore>>,
    ) -> Self {
        Self {
            generator,
            market,
            news,
            cache,
            forecasts,
        }
    }

    pub fn memory_only(
        generator: Arc<dyn AnalysisGenerator>,
        market: Arc<MarketDataService>,
        news: Arc<NewsService>,
    ) -> Self {
        let cache = TieredCache::memory_only("analysis", CachePolicy::analysis());
        Self::new(generator, market, news, cache, None)
    }

    pub async fn get_analysis(&self, force_refresh: bool) -> GoldResult<AnalysisReport> {
        let result = self
            .cache
            .get_or_recompute(ANALYSIS_KEY, force_refresh, || self.generate())
            .await;

        match result {
            Ok((entry, from)) => {
                let source = match from {
                    ServedFrom::Fresh => self.generator.name().to_string(),
                    tier => tier.label().to_string(),
                };
                Ok(AnalysisReport {
                    analysis: entry.payload,
                    source,
                    captured_at: entry.captured_at,
                    degraded: false,
                })
            }
            Err(e) => match self.cache.stale(ANALYSIS_KEY) {
                Some(stale) => {
                    warn!(error = %e, "Analysis generation failed, serving stale analysis");
                    Ok(AnalysisReport {
                        analysis: stale.payload,
                        source: "memory_fallback".to_string(),
                        captured_at: stale.captured_at,
                        degraded: true,
                    })
                }
                None => Err(e),
            },
        }
    }

    async fn generate(&self) -> GoldResult<MarketAnalysis> {
        let snapshot = self.market.get_snapshot(false).await?;

        let headlines = match self.news.get_headlines(false).await {
            Ok(feed) => feed.headlines.into_iter().take(PROMPT_HEADLINES).collect(),
            Err(e) => {
                warn!("Analysis running without headlines: {}", e);
                Vec::new()
            }
        };

        let input = AnalysisInput::from_snapshot(&snapshot, headlines);
        let analysis = self.generator.generate(&input).await?;
        info!(
            generator = self.generator.name(),
            trend = %analysis.trend,
            "Generated fresh analysis"
        );

        self.record_forecast(&analysis, &snapshot);
        Ok(analysis)
    }

    fn record_forecast(&self, analysis: &MarketAnalysis, snapshot: &MarketSnapshot) {
        let Some(store) = self.forecasts.as_ref() else {
            return;
        };
        if analysis.forecast_curve.is_empty() {
            return;
        }

        let record = ForecastRecord::pending(
            Horizon::Day,
            snapshot.primary().sell,
            analysis.trend.clone(),
            analysis.confidence,
            analysis.summary.clone(),
            analysis.forecast_curve.clone(),
            self.generator.name(),
        );

        match store.insert(&record) {
            Ok(id) => info!("Recorded forecast {}", id),
            Err(e) => warn!("Failed to record forecast: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use gold_core::ForecastPoint;
    use gold_news::StaticHeadlines;
    use gold_scraper::{HtmlPriceExtractor, PageSource, ScrapeError};
    use rust_decimal_macros::dec;

    use crate::market_data_service::MarketDataConfig;

    struct StaticPage;

    #[async_trait]
    impl PageSource for StaticPage {
        async fn fetch_page(&self) -> Result<String, ScrapeError> {
            Ok(r#"<table><tr><td>Gram Altın</td><td>4.550,10</td><td>4.563,13</td><td>%0,27</td></tr></table>"#.to_string())
        }
    }

    struct CurveGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisGenerator for CurveGenerator {
        async fn generate(&self, input: &AnalysisInput) -> GoldResult<MarketAnalysis> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MarketAnalysis {
                trend: "Yükseliş".to_string(),
                confidence: 70,
                summary: format!("{} headlines", input.headlines.len()),
                factors: Vec::new(),
                forecast_curve: vec![ForecastPoint {
                    label: "+6h".to_string(),
                    target_at: input.as_of + Duration::hours(6),
                    price: input.gram_gold.sell + dec!(10),
                }],
                risk_level: "Orta".to_string(),
                generated_at: input.as_of,
            })
        }

        fn name(&self) -> &'static str {
            "curve"
        }
    }

    fn market() -> Arc<MarketDataService> {
        Arc::new(MarketDataService::new(
            Arc::new(StaticPage),
            HtmlPriceExtractor::default(),
            None,
            MarketDataConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_fresh_analysis_records_forecast() {
        let generator = Arc::new(CurveGenerator {
            calls: AtomicUsize::new(0),
        });
        let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
        let service = AnalysisService::new(
            generator.clone(),
            market(),
            Arc::new(NewsService::memory_only(Arc::new(StaticHeadlines))),
            TieredCache::memory_only("analysis", CachePolicy::analysis()),
            Some(forecasts.clone()),
        );

        let report = service.get_analysis(false).await.unwrap();
        assert_eq!(report.source, "curve");
        assert_eq!(report.analysis.summary, "3 headlines");

        let cached = service.get_analysis(false).await.unwrap();
        assert_eq!(cached.source, "memory_cache");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let recorded = forecasts.recent(Horizon::Day, 10).unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].reference_price, dec!(4563.13));
        assert_eq!(recorded[0].source, "curve");
    }
}

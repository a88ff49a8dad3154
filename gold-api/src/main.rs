//! Gold Price Tracker API Server
//!
//! Serves scraped gold and currency prices, price history, headlines, AI
//! analysis and forecast accuracy over HTTP.

mod config;
mod routes;
mod views;

use anyhow::Context;
use axum::{
    http::{header, Method},
    Router,
};
use chrono::Utc;
use gold_core::MarketAnalysis;
use gold_news::{HeadlineSource, NewsApiClient, NewsApiConfig, StaticHeadlines};
use gold_research::{AnalysisGenerator, OpenAiAnalysisGenerator, StaticAnalysisGenerator};
use gold_scraper::{FetcherConfig, HtmlPriceExtractor, PriceFetcher};
use gold_services::{
    AnalysisService, CachePolicy, CacheStore, EvaluatorConfig, ForecastStore, HeadlineBatch,
    JsonTier, MarketDataConfig, MarketDataService, NewsService, PersistentTier,
    PredictionAccuracyEvaluator, PriceStore, TieredCache,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<MarketDataService>,
    pub news: Arc<NewsService>,
    pub analysis: Arc<AnalysisService>,
    /// Persistent stores (optional - disabled when GOLD_DB_PATH is empty)
    pub prices: Option<Arc<PriceStore>>,
    pub forecasts: Option<Arc<ForecastStore>>,
    pub evaluator: Option<Arc<PredictionAccuracyEvaluator>>,
}

/// Router with CORS for the dashboard frontend
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gold_api=debug")),
        )
        .init();

    info!("Starting Gold Price Tracker API");

    let config = AppConfig::from_env();
    let state = build_state(&config)?;

    if let Some(evaluator) = state.evaluator.clone() {
        spawn_accuracy_sweep(evaluator, config.accuracy_sweep_interval);
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let fetcher = PriceFetcher::new(FetcherConfig {
        url: config.source_url.clone(),
        timeout: config.scrape_timeout,
        ..FetcherConfig::default()
    })
    .context("Failed to build price fetcher")?;

    // Persistent stores share one SQLite file
    let (prices, forecasts, cache_store) = match &config.db_path {
        Some(path) => {
            info!("Initializing SQLite storage at: {}", path.display());
            let prices = PriceStore::new(path).context("Failed to open price store")?;
            let forecasts = ForecastStore::new(path).context("Failed to open forecast store")?;
            let cache = CacheStore::new(path).context("Failed to open cache store")?;
            (
                Some(Arc::new(prices)),
                Some(Arc::new(forecasts)),
                Some(Arc::new(cache)),
            )
        }
        None => {
            warn!("GOLD_DB_PATH is empty - caches are memory-only and history is unavailable");
            (None, None, None)
        }
    };

    let ttl = chrono::Duration::from_std(config.price_cache_ttl)
        .context("PRICE_CACHE_TTL_SECS out of range")?;
    let market = Arc::new(MarketDataService::new(
        Arc::new(fetcher),
        HtmlPriceExtractor::default(),
        prices.clone(),
        MarketDataConfig {
            cache_policy: CachePolicy::prices(ttl),
        },
    ));

    // NEWS_API_KEY is optional - built-in headlines work without it
    let headline_source: Arc<dyn HeadlineSource> = match &config.news_api_key {
        Some(key) => {
            info!("News source: NewsAPI");
            Arc::new(NewsApiClient::new(NewsApiConfig::new(key.clone()))?)
        }
        None => {
            info!("No NEWS_API_KEY set - serving built-in headlines");
            Arc::new(StaticHeadlines)
        }
    };

    // OPENAI_API_KEY is read by the client itself
    let generator: Arc<dyn AnalysisGenerator> = if config.openai_enabled {
        info!("Analysis generator: OpenAI");
        Arc::new(OpenAiAnalysisGenerator::new())
    } else {
        info!("No OPENAI_API_KEY set - serving the static analysis");
        Arc::new(StaticAnalysisGenerator)
    };

    let (news, analysis) = match &cache_store {
        Some(store) => {
            let news_tier: Arc<dyn PersistentTier<HeadlineBatch>> =
                Arc::new(JsonTier::new(store.clone()));
            let analysis_tier: Arc<dyn PersistentTier<MarketAnalysis>> =
                Arc::new(JsonTier::new(store.clone()));

            let news_cache = TieredCache::new("news", CachePolicy::news(), Some(news_tier));
            let analysis_cache =
                TieredCache::new("analysis", CachePolicy::analysis(), Some(analysis_tier));
            let news = Arc::new(NewsService::new(headline_source, news_cache));
            let analysis = AnalysisService::new(
                generator,
                market.clone(),
                news.clone(),
                analysis_cache,
                forecasts.clone(),
            );
            (news, analysis)
        }
        None => {
            let news = Arc::new(NewsService::memory_only(headline_source));
            let analysis = AnalysisService::memory_only(generator, market.clone(), news.clone());
            (news, analysis)
        }
    };

    let evaluator = forecasts.clone().map(|store| {
        Arc::new(PredictionAccuracyEvaluator::new(
            store,
            prices.clone(),
            EvaluatorConfig::default(),
        ))
    });

    Ok(AppState {
        market,
        news,
        analysis: Arc::new(analysis),
        prices,
        forecasts,
        evaluator,
    })
}

/// Periodically score forecasts whose targets have passed
fn spawn_accuracy_sweep(evaluator: Arc<PredictionAccuracyEvaluator>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = evaluator.evaluate_due(Utc::now()).await {
                error!("Accuracy sweep failed: {}", e);
            }
        }
    });
}

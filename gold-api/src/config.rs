//! Server configuration from environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use gold_scraper::fetcher::DEFAULT_SOURCE_URL;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    /// SQLite file backing prices, cache entries and forecasts.
    /// `None` runs every cache memory-only.
    pub db_path: Option<PathBuf>,
    pub source_url: String,
    pub scrape_timeout: Duration,
    pub price_cache_ttl: Duration,
    pub news_api_key: Option<String>,
    pub openai_enabled: bool,
    pub accuracy_sweep_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let db_path = match get("GOLD_DB_PATH") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from("data/gold.db")),
        };

        Self {
            port: parse_or(&get, "SERVER_PORT", 3001),
            db_path,
            source_url: non_empty("GOLD_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            scrape_timeout: Duration::from_secs(parse_or(&get, "SCRAPE_TIMEOUT_SECS", 10)),
            price_cache_ttl: Duration::from_secs(parse_or(&get, "PRICE_CACHE_TTL_SECS", 300)),
            news_api_key: non_empty("NEWS_API_KEY"),
            openai_enabled: non_empty("OPENAI_API_KEY").is_some(),
            accuracy_sweep_interval: Duration::from_secs(
                parse_or(&get, "ACCURACY_SWEEP_SECS", 3600).max(1),
            ),
        }
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

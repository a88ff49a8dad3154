//! Source page fetching
//!
//! Fetches the public price page with a rotating User-Agent and a bounded
//! timeout. Any non-success status or timeout is a scrape failure.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::ScrapeError;

/// Default public price page
pub const DEFAULT_SOURCE_URL: &str = "https://altin.doviz.com/";

/// Anything that can produce the raw price page
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the raw HTML of the price page
    async fn fetch_page(&self) -> Result<String, ScrapeError>;
}

/// Configuration for `PriceFetcher`
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub url: String,
    pub timeout: Duration,
    /// Pool rotated per request to reduce blocking
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

/// HTTP client for the public price page
#[derive(Debug, Clone)]
pub struct PriceFetcher {
    client: Client,
    config: FetcherConfig,
}

impl PriceFetcher {
    /// Create a new fetcher
    pub fn new(config: FetcherConfig) -> Result<Self, ScrapeError> {
        if config.user_agents.is_empty() {
            return Err(ScrapeError::InvalidConfig(
                "User-Agent pool cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScrapeError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn pick_user_agent(&self) -> &str {
        let idx = rand::rng().random_range(0..self.config.user_agents.len());
        &self.config.user_agents[idx]
    }

    async fn send(&self, user_agent: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(&self.config.url)
            .header("User-Agent", user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "tr-TR,tr;q=0.9,en;q=0.8")
            .header("Accept-Charset", "utf-8")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScrapeError::Timeout(self.config.timeout.as_secs())
                } else {
                    ScrapeError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ScrapeError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::RequestFailed(e.to_string()))
    }
}

#[async_trait]
impl PageSource for PriceFetcher {
    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn fetch_page(&self) -> Result<String, ScrapeError> {
        let user_agent = self.pick_user_agent().to_string();

        let html = tokio::time::timeout(self.config.timeout, self.send(&user_agent))
            .await
            .map_err(|_| ScrapeError::Timeout(self.config.timeout.as_secs()))??;

        debug!("Fetched {} bytes from price page", html.len());
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_user_agent_pool_rejected() {
        let config = FetcherConfig {
            user_agents: Vec::new(),
            ..FetcherConfig::default()
        };
        assert!(matches!(
            PriceFetcher::new(config),
            Err(ScrapeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_user_agent_comes_from_pool() {
        let fetcher = PriceFetcher::new(FetcherConfig::default()).unwrap();
        for _ in 0..20 {
            let ua = fetcher.pick_user_agent();
            assert!(FetcherConfig::default().user_agents.iter().any(|u| u == ua));
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_is_scrape_error() {
        let fetcher = PriceFetcher::new(FetcherConfig {
            url: "http://127.0.0.1:9/".to_string(),
            timeout: Duration::from_secs(2),
            ..FetcherConfig::default()
        })
        .unwrap();

        let result = fetcher.fetch_page().await;
        assert!(matches!(
            result,
            Err(ScrapeError::RequestFailed(_)) | Err(ScrapeError::Timeout(_))
        ));
    }
}

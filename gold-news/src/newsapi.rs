//! NewsAPI client for market headlines

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use async_trait::async_trait;
use gold_core::Headline;

use crate::error::NewsError;
use crate::source::HeadlineSource;
use crate::static_headlines::StaticHeadlines;

/// Words that make a headline relevant to the gold market
const RELEVANT_TITLE_KEYWORDS: [&str; 6] = ["gold", "fed", "dollar", "economy", "inflation", "bank"];

/// NewsAPI configuration
#[derive(Debug, Clone)]
pub struct NewsApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub country: String,
    pub category: String,
    /// Articles requested per call (filtered heavily afterwards)
    pub page_size: u32,
    /// Headlines kept after filtering
    pub max_results: usize,
}

impl NewsApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://newsapi.org/v2".to_string(),
            country: "us".to_string(),
            category: "business".to_string(),
            page_size: 50,
            max_results: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TopHeadlinesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    source: ArticleSource,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// NewsAPI top-headlines client
pub struct NewsApiClient {
    client: Client,
    config: NewsApiConfig,
}

impl NewsApiClient {
    /// Create a new NewsAPI client
    pub fn new(config: NewsApiConfig) -> Result<Self, NewsError> {
        if config.api_key.trim().is_empty() {
            return Err(NewsError::InvalidConfig("NEWS_API_KEY is empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    #[instrument(skip(self), fields(category = %self.config.category))]
    async fn fetch_top_headlines(&self) -> Result<Vec<Headline>, NewsError> {
        let page_size = self.config.page_size.to_string();
        let response = self
            .client
            .get(format!("{}/top-headlines", self.config.base_url))
            .query(&[
                ("country", self.config.country.as_str()),
                ("category", self.config.category.as_str()),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .header("User-Agent", "GoldTracker/1.0")
            .send()
            .await
            .map_err(|e| NewsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: TopHeadlinesResponse = response
            .json()
            .await
            .map_err(|e| NewsError::ParseError(e.to_string()))?;

        if body.status == "error" {
            return Err(NewsError::ApiError {
                status: 200,
                message: body.message.unwrap_or_default(),
            });
        }

        debug!("NewsAPI returned {} articles", body.articles.len());
        Ok(filter_articles(body.articles, self.config.max_results))
    }
}

#[async_trait]
impl HeadlineSource for NewsApiClient {
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, NewsError> {
        let headlines = self.fetch_top_headlines().await?;

        if headlines.is_empty() {
            warn!("No relevant NewsAPI headlines, using built-in headlines");
            return Ok(StaticHeadlines::headlines_at(Utc::now()));
        }

        info!("Fetched {} relevant headlines from NewsAPI", headlines.len());
        Ok(headlines)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}

/// Keep articles that have a title and description, are not removed, and
/// mention a relevant keyword.
fn filter_articles(articles: Vec<Article>, max_results: usize) -> Vec<Headline> {
    articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title?;
            let description = article.description?;

            if title.contains("[Removed]") || !is_relevant(&title, &description) {
                return None;
            }

            let published_at = article
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            Some(Headline {
                title,
                description,
                url: article.url,
                published_at,
                source_name: article.source.name.unwrap_or_else(|| "NewsAPI".to_string()),
            })
        })
        .take(max_results)
        .collect()
}

/// Gold may appear in either field; macro keywords only count in the title
fn is_relevant(title: &str, description: &str) -> bool {
    let title = title.to_lowercase();
    description.to_lowercase().contains("gold")
        || RELEVANT_TITLE_KEYWORDS.iter().any(|kw| title.contains(kw))
}

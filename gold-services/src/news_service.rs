//! News Service
//!
//! Cached market headlines. A failing headline source falls back to the
//! built-in headlines, so this service only fails when nothing at all can
//! be produced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gold_core::{GoldResult, Headline};
use gold_news::{HeadlineSource, StaticHeadlines};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::tiered_cache::{CachePolicy, ServedFrom, TieredCache};

const NEWS_KEY: &str = "news";

/// Headlines plus the source that produced them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineBatch {
    pub headlines: Vec<Headline>,
    pub origin: String,
}

/// Headlines as served to a caller
#[derive(Debug, Clone)]
pub struct NewsFeed {
    pub headlines: Vec<Headline>,
    /// Cache tier label, or the producing source for fresh batches
    pub source: String,
    pub captured_at: DateTime<Utc>,
}

pub struct NewsService {
    source: Arc<dyn HeadlineSource>,
    cache: TieredCache<HeadlineBatch>,
}

impl NewsService {
    pub fn new(source: Arc<dyn HeadlineSource>, cache: TieredCache<HeadlineBatch>) -> Self {
        Self { source, cache }
    }

    pub fn memory_only(source: Arc<dyn HeadlineSource>) -> Self {
        Self::new(source, TieredCache::memory_only("news", CachePolicy::news()))
    }

    pub async fn get_headlines(&self, force_refresh: bool) -> GoldResult<NewsFeed> {
        let (entry, from) = self
            .cache
            .get_or_recompute(NEWS_KEY, force_refresh, || self.fetch())
            .await?;

        let source = match from {
            ServedFrom::Fresh => entry.payload.origin.clone(),
            tier => tier.label().to_string(),
        };

        Ok(NewsFeed {
            headlines: entry.payload.headlines,
            source,
            captured_at: entry.captured_at,
        })
    }

    async fn fetch(&self) -> GoldResult<HeadlineBatch> {
        match self.source.fetch_headlines().await {
            Ok(headlines) => {
                info!("Fetched {} headlines from {}", headlines.len(), self.source.name());
                Ok(HeadlineBatch {
                    headlines,
                    origin: self.source.name().to_string(),
                })
            }
            Err(e) => {
                warn!("Headline source {} failed: {}", self.source.name(), e);
                Ok(HeadlineBatch {
                    headlines: StaticHeadlines::headlines_at(Utc::now()),
                    origin: StaticHeadlines.name().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gold_news::NewsError;

    struct FlakySource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HeadlineSource for FlakySource {
        async fn fetch_headlines(&self) -> Result<Vec<Headline>, NewsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NewsError::RequestFailed("connection reset".to_string()));
            }
            Ok(vec![Headline {
                title: "Gold climbs as dollar slips".to_string(),
                description: "Spot gold rose".to_string(),
                url: Some("https://example.com/gold".to_string()),
                published_at: Utc::now(),
                source_name: "Reuters".to_string(),
            }])
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_headlines_cached_in_memory() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let service = NewsService::memory_only(source.clone());

        let first = service.get_headlines(false).await.unwrap();
        assert_eq!(first.source, "flaky");
        assert_eq!(first.headlines.len(), 1);

        let second = service.get_headlines(false).await.unwrap();
        assert_eq!(second.source, "memory_cache");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_source_uses_static_headlines() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let service = NewsService::memory_only(source);

        let feed = service.get_headlines(false).await.unwrap();
        assert_eq!(feed.source, "static");
        assert_eq!(feed.headlines.len(), 5);
    }
}

use async_trait::async_trait;
use gold_core::Headline;

use crate::error::NewsError;

/// Anything that can provide an ordered list of market headlines
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch the current headlines, most relevant first
    async fn fetch_headlines(&self) -> Result<Vec<Headline>, NewsError>;

    /// Label recorded alongside cached headlines (e.g. "newsapi", "static")
    fn name(&self) -> &'static str;
}

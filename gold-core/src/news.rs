//! News headline structures fed to the analysis generator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single market-relevant news headline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    /// Article title
    pub title: String,
    /// Short description/excerpt
    pub description: String,
    /// Article URL (absent for built-in headlines)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Publication date
    pub published_at: DateTime<Utc>,
    /// Name of the publishing outlet
    pub source_name: String,
}

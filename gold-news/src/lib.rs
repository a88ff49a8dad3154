//! Headline sources for the gold market analysis
//!
//! - NewsAPI: top business headlines filtered to gold/macro keywords
//! - Static: built-in Turkish market headlines used when no API key is set

pub mod error;
pub mod newsapi;
pub mod source;
pub mod static_headlines;

pub use error::NewsError;
pub use newsapi::{NewsApiClient, NewsApiConfig};
pub use source::HeadlineSource;
pub use static_headlines::StaticHeadlines;

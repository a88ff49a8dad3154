//! Price page scraping for the Gold Price Tracker
//!
//! This crate provides:
//! - `PriceFetcher`: HTTP fetch of the source page with User-Agent rotation
//! - `HtmlPriceExtractor`: normalizes the semi-structured page into a `MarketSnapshot`
//! - `numeric`: locale-aware number parsing with an explicit "absent" tag

pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod numeric;

pub use error::ScrapeError;
pub use extractor::{ExtractorConfig, HtmlPriceExtractor, RowFields};
pub use fetcher::{FetcherConfig, PageSource, PriceFetcher};
pub use numeric::ParsedField;

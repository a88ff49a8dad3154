//! Market analysis generation for the gold tracker
//!
//! The generator is a black box to the rest of the pipeline: it takes the
//! current snapshot plus recent headlines and returns a `MarketAnalysis`
//! carrying a short-term forecast curve.

pub mod generator;
pub mod openai;

pub use generator::{fallback_analysis, AnalysisGenerator, AnalysisInput, StaticAnalysisGenerator};
pub use openai::OpenAiAnalysisGenerator;

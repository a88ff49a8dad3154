use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gold_core::{
    AnalysisFactor, FactorImpact, GoldResult, Headline, InstrumentKind, MarketAnalysis,
    MarketSnapshot, MarketTrend, PriceQuote,
};

/// Everything the generator is allowed to see
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    /// Primary instrument quote (gram gold)
    pub gram_gold: PriceQuote,
    /// USD/TRY quote, absent when the ticker was not parsed
    pub usd_try: Option<PriceQuote>,
    pub headlines: Vec<Headline>,
    pub as_of: DateTime<Utc>,
}

impl AnalysisInput {
    pub fn from_snapshot(snapshot: &MarketSnapshot, headlines: Vec<Headline>) -> Self {
        let usd_try = Some(snapshot.quote(InstrumentKind::UsdTry)).filter(|q| !q.is_zero());

        Self {
            gram_gold: snapshot.primary(),
            usd_try,
            headlines,
            as_of: snapshot.captured_at,
        }
    }

    pub fn trend(&self) -> MarketTrend {
        MarketTrend::from_change_percent(self.gram_gold.change_percent)
    }
}

/// Produces a market analysis from the current market state
#[async_trait]
pub trait AnalysisGenerator: Send + Sync {
    async fn generate(&self, input: &AnalysisInput) -> GoldResult<MarketAnalysis>;

    /// Label stored with the analysis and its forecast record
    fn name(&self) -> &'static str;
}

/// Analysis shown when no generator is configured or generation failed
pub fn fallback_analysis(now: DateTime<Utc>) -> MarketAnalysis {
    MarketAnalysis {
        trend: "Yükseliş".to_string(),
        confidence: 75,
        summary: "Altın fiyatları Fed politika belirsizliği ve jeopolitik riskler nedeniyle yükseliş trendinde. USD/TRY paritesindeki artış da altın talebini destekliyor.".to_string(),
        factors: vec![
            AnalysisFactor {
                factor: "Fed Faiz Oranları".to_string(),
                impact: FactorImpact::Positive,
                weight: 85,
            },
            AnalysisFactor {
                factor: "USD/TRY".to_string(),
                impact: FactorImpact::Positive,
                weight: 80,
            },
            AnalysisFactor {
                factor: "TCMB Politikaları".to_string(),
                impact: FactorImpact::Neutral,
                weight: 70,
            },
        ],
        forecast_curve: Vec::new(),
        risk_level: "Orta".to_string(),
        generated_at: now,
    }
}

/// Generator that always returns the built-in analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAnalysisGenerator;

#[async_trait]
impl AnalysisGenerator for StaticAnalysisGenerator {
    async fn generate(&self, input: &AnalysisInput) -> GoldResult<MarketAnalysis> {
        Ok(fallback_analysis(input.as_of))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gold_core::SnapshotSource;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(Utc::now(), SnapshotSource::Live);
        snapshot.set(PriceQuote {
            kind: InstrumentKind::GramGold,
            buy: dec!(4550.10),
            sell: dec!(4563.13),
            change: dec!(12.5),
            change_percent: dec!(0.27),
        });
        snapshot
    }

    #[test]
    fn test_input_from_snapshot() {
        let input = AnalysisInput::from_snapshot(&snapshot(), Vec::new());

        assert_eq!(input.gram_gold.sell, dec!(4563.13));
        assert!(input.usd_try.is_none());
        assert_eq!(input.trend(), MarketTrend::Up);
    }

    #[tokio::test]
    async fn test_static_generator_has_no_curve() {
        let input = AnalysisInput::from_snapshot(&snapshot(), Vec::new());
        let analysis = StaticAnalysisGenerator.generate(&input).await.unwrap();

        assert_eq!(analysis.confidence, 75);
        assert_eq!(analysis.factors.len(), 3);
        assert!(analysis.forecast_curve.is_empty());
    }
}

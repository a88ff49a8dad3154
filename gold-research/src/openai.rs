use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use gold_core::{
    AnalysisFactor, ForecastPoint, GoldError, GoldResult, Horizon, MarketAnalysis, MarketTrend,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::generator::{AnalysisGenerator, AnalysisInput};

const SYSTEM_PROMPT: &str = r#"Sen altın piyasası uzmanısın. Türkiye'deki altın piyasasını kısa ve net analiz et.

SADECE bu JSON formatında yanıt ver (kısa ve net):

{
  "trend": "Yükseliş|Düşüş|Yatay",
  "confidence": 0-100,
  "summary": "KISA özet (100 kelime max, güncel verilerle)",
  "factors": [
    {"factor": "Fed Faiz Oranları", "impact": "positive|negative|neutral", "weight": 0-100},
    {"factor": "USD/TRY", "impact": "positive|negative|neutral", "weight": 0-100},
    {"factor": "TCMB Politikaları", "impact": "positive|negative|neutral", "weight": 0-100}
  ],
  "forecast_curve": [
    {"label": "+6h", "hours_ahead": 6, "price": 0.0},
    {"label": "+12h", "hours_ahead": 12, "price": 0.0},
    {"label": "+18h", "hours_ahead": 18, "price": 0.0},
    {"label": "+24h", "hours_ahead": 24, "price": 0.0}
  ],
  "risk_level": "Düşük|Orta|Yüksek"
}

Tahmin fiyatlarını mevcut gram altın fiyatına yakın, gerçekçi ver. SADECE JSON, başka açıklama yok."#;

/// Generator response before it is anchored to a point in time
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    trend: String,
    /// Models occasionally answer `85.5` or `120`
    confidence: f64,
    summary: String,
    #[serde(default)]
    factors: Vec<AnalysisFactor>,
    #[serde(default)]
    forecast_curve: Vec<RawForecastPoint>,
    #[serde(default = "default_risk_level")]
    risk_level: String,
}

#[derive(Debug, Deserialize)]
struct RawForecastPoint {
    label: String,
    hours_ahead: i64,
    price: Decimal,
}

fn default_risk_level() -> String {
    "Orta".to_string()
}

fn clamp_confidence(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

impl RawAnalysis {
    fn into_analysis(self, as_of: DateTime<Utc>) -> MarketAnalysis {
        let horizon = Horizon::Day.duration();
        let mut forecast_curve: Vec<ForecastPoint> = self
            .forecast_curve
            .into_iter()
            .filter(|p| p.price > Decimal::ZERO)
            .filter_map(|p| {
                let ahead = TimeDelta::try_hours(p.hours_ahead)
                    .filter(|d| *d > TimeDelta::zero() && *d <= horizon)?;
                Some(ForecastPoint {
                    label: p.label,
                    target_at: as_of.checked_add_signed(ahead)?,
                    price: p.price,
                })
            })
            .collect();
        forecast_curve.sort_by_key(|p| p.target_at);

        MarketAnalysis {
            trend: self.trend,
            confidence: clamp_confidence(self.confidence),
            summary: self.summary,
            factors: self.factors,
            forecast_curve,
            risk_level: self.risk_level,
            generated_at: as_of,
        }
    }
}

/// Chat-completion backed analysis generator
#[derive(Debug, Clone)]
pub struct OpenAiAnalysisGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnalysisGenerator {
    pub fn new() -> Self {
        // async-openai reads OPENAI_API_KEY from env automatically
        let config = OpenAIConfig::default();
        let client = Client::with_config(config);

        Self {
            client,
            model: "gpt-4o".to_string(),
        }
    }
}

impl Default for OpenAiAnalysisGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisGenerator for OpenAiAnalysisGenerator {
    #[instrument(skip(self, input), fields(model = %self.model))]
    async fn generate(&self, input: &AnalysisInput) -> GoldResult<MarketAnalysis> {
        let user_prompt = build_user_prompt(input);
        debug!("Analysis prompt is {} chars", user_prompt.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| GoldError::internal(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()
                    .map_err(|e| GoldError::internal(e.to_string()))?
                    .into(),
            ])
            .temperature(0.3)
            .build()
            .map_err(|e| GoldError::internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GoldError::internal(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| GoldError::parse("No response from OpenAI"))?;

        let analysis = parse_analysis(content, input.as_of)?;
        info!(
            trend = %analysis.trend,
            confidence = analysis.confidence,
            points = analysis.forecast_curve.len(),
            "Generated market analysis"
        );
        Ok(analysis)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn parse_analysis(content: &str, as_of: DateTime<Utc>) -> GoldResult<MarketAnalysis> {
    let json_str = extract_json(content)?;
    let raw: RawAnalysis = serde_json::from_str(&json_str)
        .map_err(|e| GoldError::parse(format!("Failed to parse analysis: {}", e)))?;
    Ok(raw.into_analysis(as_of))
}

fn build_user_prompt(input: &AnalysisInput) -> String {
    let gram = &input.gram_gold;

    let usd_try_line = match &input.usd_try {
        Some(q) => format!("• USD/TRY Kuru: {} TL ({}%)", q.sell.round_dp(4), q.change_percent),
        None => "• USD/TRY Kuru: Mevcut değil".to_string(),
    };

    let headlines = if input.headlines.is_empty() {
        "Güncel ekonomi haberleri mevcut değil.".to_string()
    } else {
        input
            .headlines
            .iter()
            .take(8)
            .map(|h| format!("• {}", h.title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"GÜNCEL DURUM:
• Gram Altın: {} TL ({}%)
• Günlük Değişim: {} TL
• Trend: {}
{}

SON HABERLER:
{}

ARAŞTIR: TCMB faiz oranları, Fed politikaları, USD/TRY beklentileri, Türkiye enflasyonu."#,
        gram.sell.round_dp(2),
        gram.change_percent,
        gram.change.round_dp(2),
        trend_label(input.trend()),
        usd_try_line,
        headlines,
    )
}

fn trend_label(trend: MarketTrend) -> &'static str {
    match trend {
        MarketTrend::Up => "Yükseliş",
        MarketTrend::Down => "Düşüş",
        MarketTrend::Sideways => "Yatay",
    }
}

/// Extract JSON from a model response (handles markdown code blocks)
fn extract_json(content: &str) -> GoldResult<String> {
    if let Some(start) = content.find("```json") {
        let start = start + 7;
        if let Some(end) = content[start..].find("```") {
            return Ok(content[start..start + end].trim().to_string());
        }
    }

    if let Some(start) = content.find('{') {
        if let Some(end) = content.rfind('}') {
            if end > start {
                return Ok(content[start..=end].to_string());
            }
        }
    }

    Err(GoldError::parse("No JSON found in response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gold_core::{FactorImpact, Headline, InstrumentKind, PriceQuote};
    use rust_decimal_macros::dec;

    const RESPONSE: &str = r#"{
        "trend": "Yükseliş",
        "confidence": 72,
        "summary": "Fed beklentileri altını destekliyor.",
        "factors": [{"factor": "USD/TRY", "impact": "positive", "weight": 80}],
        "forecast_curve": [
            {"label": "+12h", "hours_ahead": 12, "price": 4580.5},
            {"label": "+6h", "hours_ahead": 6, "price": 4570}
        ],
        "risk_level": "Orta"
    }"#;

    fn input(headlines: Vec<Headline>) -> AnalysisInput {
        AnalysisInput {
            gram_gold: PriceQuote {
                kind: InstrumentKind::GramGold,
                buy: dec!(4550.10),
                sell: dec!(4563.13),
                change: dec!(-5.20),
                change_percent: dec!(-0.45),
            },
            usd_try: None,
            headlines,
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_extract_json_fenced() {
        let content = format!("Analiz:\n```json\n{}\n```\nSon.", RESPONSE);
        let json = extract_json(&content).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_json_missing() {
        assert!(matches!(extract_json("no json here"), Err(GoldError::Parse(_))));
        assert!(matches!(extract_json("} {"), Err(GoldError::Parse(_))));
    }

    #[test]
    fn test_parse_analysis_anchors_curve() {
        let as_of = Utc::now();
        let analysis = parse_analysis(RESPONSE, as_of).unwrap();

        assert_eq!(analysis.confidence, 72);
        assert_eq!(analysis.factors[0].impact, FactorImpact::Positive);
        assert_eq!(analysis.forecast_curve.len(), 2);
        assert_eq!(analysis.forecast_curve[0].label, "+6h");
        assert_eq!(analysis.forecast_curve[0].target_at, as_of + TimeDelta::hours(6));
        assert_eq!(analysis.forecast_curve[1].price, dec!(4580.5));
    }

    #[test]
    fn test_out_of_range_hours_dropped() {
        let response = r#"{
            "trend": "Yatay",
            "confidence": 50,
            "summary": "",
            "forecast_curve": [
                {"label": "+6h", "hours_ahead": 6, "price": 4570},
                {"label": "far", "hours_ahead": 10000000000, "price": 4575},
                {"label": "+48h", "hours_ahead": 48, "price": 4580},
                {"label": "past", "hours_ahead": -3, "price": 4560},
                {"label": "min", "hours_ahead": -9223372036854775808, "price": 4560}
            ]
        }"#;
        let as_of = Utc::now();
        let analysis = parse_analysis(response, as_of).unwrap();

        assert_eq!(analysis.forecast_curve.len(), 1);
        assert_eq!(analysis.forecast_curve[0].label, "+6h");
        assert_eq!(analysis.risk_level, "Orta");
    }

    #[test]
    fn test_fractional_confidence_clamped() {
        let response = |confidence: &str| {
            format!(
                r#"{{"trend": "Yatay", "confidence": {}, "summary": ""}}"#,
                confidence
            )
        };

        let as_of = Utc::now();
        assert_eq!(parse_analysis(&response("85.5"), as_of).unwrap().confidence, 86);
        assert_eq!(parse_analysis(&response("120"), as_of).unwrap().confidence, 100);
        assert_eq!(parse_analysis(&response("-4"), as_of).unwrap().confidence, 0);
    }

    #[test]
    fn test_prompt_contains_market_state() {
        let headline = Headline {
            title: "Fed faiz kararı".to_string(),
            description: String::new(),
            url: None,
            published_at: Utc::now(),
            source_name: "Test".to_string(),
        };
        let prompt = build_user_prompt(&input(vec![headline]));

        assert!(prompt.contains("4563.13 TL (-0.45%)"));
        assert!(prompt.contains("Trend: Düşüş"));
        assert!(prompt.contains("USD/TRY Kuru: Mevcut değil"));
        assert!(prompt.contains("• Fed faiz kararı"));
    }

    #[test]
    fn test_prompt_without_headlines() {
        let prompt = build_user_prompt(&input(Vec::new()));
        assert!(prompt.contains("Güncel ekonomi haberleri mevcut değil."));
    }
}

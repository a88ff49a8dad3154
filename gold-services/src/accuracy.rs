//! Prediction Accuracy Evaluator
//!
//! Scores a forecast curve against the prices actually observed at its
//! target times and writes the result back onto the forecast record once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gold_core::{ForecastPoint, ForecastRecord, GoldError, GoldResult, ObservedPoint};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::forecast_storage::ForecastStore;
use crate::price_storage::PriceStore;

/// Score penalty per unit of average relative error: a 1% mean error costs
/// 100 points.
///
/// Fitted so that a `[100]` forecast against an observed `[150]` scores 0,
/// and `[4010, 3990]` against `[4000, 4000]` (0.25% mean error) scores 75.
/// A plain `* 100` penalty would score the first case 66.67.
const ERROR_PENALTY: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

#[derive(Debug, Clone, Copy)]
pub struct EvaluatorConfig {
    /// Furthest a persisted snapshot may be from a target time to count as
    /// its observation
    pub observation_tolerance: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            observation_tolerance: Duration::minutes(30),
        }
    }
}

/// Outcome of a scoring attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOutcome {
    Scored(Decimal),
    /// The record already carried a score; it was left untouched
    NoOp,
}

/// Result of one accuracy sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scored: usize,
    /// Due forecasts without a full observation set (left pending)
    pub skipped: usize,
}

/// Accuracy of `forecast` against `observed`, in [0, 100].
///
/// Curves must be non-empty, of equal length, and carry the same time label
/// at each index. For each pair the relative error is
/// `|predicted - observed| / observed` (zero when `observed` is zero); the
/// score is `100 - mean_error * 10000`, clamped and rounded to 2 dp.
pub fn score(forecast: &[ForecastPoint], observed: &[ObservedPoint]) -> GoldResult<Decimal> {
    if forecast.is_empty() || observed.is_empty() {
        return Err(GoldError::alignment("forecast and observed curves must be non-empty"));
    }
    if forecast.len() != observed.len() {
        return Err(GoldError::alignment(format!(
            "curve lengths differ: {} forecast vs {} observed",
            forecast.len(),
            observed.len()
        )));
    }
    if let Some((f, o)) = forecast.iter().zip(observed).find(|(f, o)| f.label != o.label) {
        return Err(GoldError::alignment(format!(
            "time labels differ: {} vs {}",
            f.label, o.label
        )));
    }

    let total_error: Decimal = forecast
        .iter()
        .zip(observed)
        .map(|(f, o)| {
            if o.price.is_zero() {
                Decimal::ZERO
            } else {
                (f.price - o.price).abs() / o.price
            }
        })
        .sum();
    let mean_error = total_error / Decimal::from(forecast.len());

    let accuracy = Decimal::ONE_HUNDRED - mean_error * ERROR_PENALTY;
    Ok(accuracy
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp(2))
}

/// Scores stored forecasts and persists the results
pub struct PredictionAccuracyEvaluator {
    forecasts: Arc<ForecastStore>,
    prices: Option<Arc<PriceStore>>,
    config: EvaluatorConfig,
}

impl PredictionAccuracyEvaluator {
    pub fn new(
        forecasts: Arc<ForecastStore>,
        prices: Option<Arc<PriceStore>>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            forecasts,
            prices,
            config,
        }
    }

    /// Build the observed curve from persisted snapshots and score `id`
    #[instrument(skip(self))]
    pub async fn score_and_persist(&self, id: i64) -> GoldResult<ScoreOutcome> {
        let record = self.load(id)?;
        if record.accuracy_score.is_some() {
            debug!("Forecast {} already scored", id);
            return Ok(ScoreOutcome::NoOp);
        }

        let observed = self
            .observe(&record, Utc::now())?
            .ok_or_else(|| {
                GoldError::alignment(format!("forecast {} has no complete observed curve yet", id))
            })?;

        self.persist(&record, observed)
    }

    /// Score `id` against a caller-supplied observed curve
    #[instrument(skip(self, observed))]
    pub async fn score_with_observed(
        &self,
        id: i64,
        observed: Vec<ObservedPoint>,
    ) -> GoldResult<ScoreOutcome> {
        let record = self.load(id)?;
        if record.accuracy_score.is_some() {
            debug!("Forecast {} already scored", id);
            return Ok(ScoreOutcome::NoOp);
        }

        self.persist(&record, observed)
    }

    /// Score every pending forecast whose last target time has passed.
    /// Forecasts that cannot be fully observed yet stay pending.
    #[instrument(skip(self))]
    pub async fn evaluate_due(&self, now: DateTime<Utc>) -> GoldResult<SweepReport> {
        let due = self.forecasts.pending_due(now)?;
        let mut report = SweepReport::default();

        for record in due {
            let observed = match self.observe(&record, now) {
                Ok(Some(observed)) => observed,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Could not observe forecast {}: {}", record.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            match self.persist(&record, observed) {
                Ok(ScoreOutcome::Scored(_)) => report.scored += 1,
                Ok(ScoreOutcome::NoOp) => {}
                Err(e) => {
                    warn!("Could not score forecast {}: {}", record.id, e);
                    report.skipped += 1;
                }
            }
        }

        if report.scored > 0 || report.skipped > 0 {
            info!(
                scored = report.scored,
                skipped = report.skipped,
                "Accuracy sweep finished"
            );
        }
        Ok(report)
    }

    fn load(&self, id: i64) -> GoldResult<ForecastRecord> {
        self.forecasts
            .get(id)?
            .ok_or_else(|| GoldError::not_found(format!("forecast {}", id)))
    }

    /// Observed curve aligned with the forecast curve, or `None` when any
    /// target time is still in the future or has no nearby snapshot
    fn observe(
        &self,
        record: &ForecastRecord,
        now: DateTime<Utc>,
    ) -> GoldResult<Option<Vec<ObservedPoint>>> {
        let Some(prices) = self.prices.as_ref() else {
            return Err(GoldError::config("price history is not configured"));
        };

        if !record.is_due(now) {
            return Ok(None);
        }

        let mut observed = Vec::with_capacity(record.forecast_curve.len());
        for point in &record.forecast_curve {
            let snapshot = prices.nearest_to(point.target_at, self.config.observation_tolerance)?;
            match snapshot.filter(|s| s.is_valid()) {
                Some(snapshot) => observed.push(ObservedPoint {
                    label: point.label.clone(),
                    observed_at: snapshot.captured_at,
                    price: snapshot.primary().sell,
                }),
                None => {
                    debug!(
                        "No snapshot within tolerance of {} for forecast {}",
                        point.label, record.id
                    );
                    return Ok(None);
                }
            }
        }

        Ok(Some(observed))
    }

    fn persist(
        &self,
        record: &ForecastRecord,
        observed: Vec<ObservedPoint>,
    ) -> GoldResult<ScoreOutcome> {
        let accuracy = score(&record.forecast_curve, &observed)?;

        if self.forecasts.update_accuracy(record.id, &observed, accuracy)? {
            info!("Forecast {} scored {}", record.id, accuracy);
            Ok(ScoreOutcome::Scored(accuracy))
        } else {
            Ok(ScoreOutcome::NoOp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gold_core::{Horizon, InstrumentKind, MarketSnapshot, PriceQuote, SnapshotSource};
    use rust_decimal_macros::dec;

    fn curves(
        predicted: &[Decimal],
        actual: &[Decimal],
    ) -> (Vec<ForecastPoint>, Vec<ObservedPoint>) {
        let now = Utc::now();
        let forecast = predicted
            .iter()
            .enumerate()
            .map(|(i, p)| ForecastPoint {
                label: format!("+{}h", i + 1),
                target_at: now,
                price: *p,
            })
            .collect();
        let observed = actual
            .iter()
            .enumerate()
            .map(|(i, p)| ObservedPoint {
                label: format!("+{}h", i + 1),
                observed_at: now,
                price: *p,
            })
            .collect();
        (forecast, observed)
    }

    #[test]
    fn test_perfect_forecast_scores_100() {
        let (f, o) = curves(&[dec!(100), dec!(110), dec!(120)], &[dec!(100), dec!(110), dec!(120)]);
        assert_eq!(score(&f, &o).unwrap(), dec!(100));
    }

    #[test]
    fn test_large_miss_clamps_to_zero() {
        let (f, o) = curves(&[dec!(100)], &[dec!(150)]);
        assert_eq!(score(&f, &o).unwrap(), dec!(0));
    }

    #[test]
    fn test_small_miss_partial_score() {
        // 0.25% mean error
        let (f, o) = curves(&[dec!(4010), dec!(3990)], &[dec!(4000), dec!(4000)]);
        assert_eq!(score(&f, &o).unwrap(), dec!(75));
    }

    #[test]
    fn test_zero_observed_price_is_zero_error() {
        let (f, o) = curves(&[dec!(100), dec!(50)], &[dec!(100), dec!(0)]);
        assert_eq!(score(&f, &o).unwrap(), dec!(100));
    }

    #[test]
    fn test_misaligned_curves_rejected() {
        let (f, o) = curves(&[dec!(100), dec!(110)], &[dec!(100)]);
        assert!(matches!(score(&f, &o), Err(GoldError::Alignment(_))));

        let (f, mut o) = curves(&[dec!(100)], &[dec!(100)]);
        o[0].label = "+2h".to_string();
        assert!(matches!(score(&f, &o), Err(GoldError::Alignment(_))));

        assert!(matches!(score(&[], &[]), Err(GoldError::Alignment(_))));
    }

    fn stored_forecast(store: &ForecastStore, target_at: DateTime<Utc>) -> i64 {
        let record = ForecastRecord::pending(
            Horizon::Day,
            dec!(4000),
            "Yatay",
            60,
            "",
            vec![ForecastPoint {
                label: "+6h".to_string(),
                target_at,
                price: dec!(4010),
            }],
            "test",
        );
        store.insert(&record).unwrap()
    }

    fn gram_snapshot(captured_at: DateTime<Utc>, sell: Decimal) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(captured_at, SnapshotSource::Live);
        snapshot.set(PriceQuote {
            kind: InstrumentKind::GramGold,
            buy: sell - dec!(10),
            sell,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
        });
        snapshot
    }

    #[tokio::test]
    async fn test_score_with_observed_is_idempotent() {
        let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
        let id = stored_forecast(&forecasts, Utc::now() - Duration::hours(1));
        let evaluator =
            PredictionAccuracyEvaluator::new(forecasts.clone(), None, EvaluatorConfig::default());

        let observed = vec![ObservedPoint {
            label: "+6h".to_string(),
            observed_at: Utc::now(),
            price: dec!(4000),
        }];

        let first = evaluator.score_with_observed(id, observed.clone()).await.unwrap();
        assert_eq!(first, ScoreOutcome::Scored(dec!(75)));

        let second = evaluator.score_with_observed(id, observed).await.unwrap();
        assert_eq!(second, ScoreOutcome::NoOp);
        assert_eq!(forecasts.get(id).unwrap().unwrap().accuracy_score, Some(dec!(75)));
    }

    #[tokio::test]
    async fn test_unknown_forecast_is_not_found() {
        let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
        let evaluator = PredictionAccuracyEvaluator::new(forecasts, None, EvaluatorConfig::default());

        assert!(matches!(
            evaluator.score_with_observed(42, Vec::new()).await,
            Err(GoldError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_misaligned_observed_leaves_record_pending() {
        let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
        let id = stored_forecast(&forecasts, Utc::now() - Duration::hours(1));
        let evaluator =
            PredictionAccuracyEvaluator::new(forecasts.clone(), None, EvaluatorConfig::default());

        let result = evaluator.score_with_observed(id, Vec::new()).await;
        assert!(matches!(result, Err(GoldError::Alignment(_))));
        assert!(forecasts.get(id).unwrap().unwrap().accuracy_score.is_none());
    }

    #[tokio::test]
    async fn test_evaluate_due_uses_nearest_snapshot() {
        let forecasts = Arc::new(ForecastStore::new_in_memory().unwrap());
        let prices = Arc::new(PriceStore::new_in_memory().unwrap());
        let now = Utc::now();

        let observable = stored_forecast(&forecasts, now - Duration::hours(2));
        let unobservable = stored_forecast(&forecasts, now - Duration::hours(10));
        let future = stored_forecast(&forecasts, now + Duration::hours(3));

        prices
            .insert_snapshot(&gram_snapshot(now - Duration::hours(2) + Duration::minutes(10), dec!(4000)))
            .unwrap();

        let evaluator = PredictionAccuracyEvaluator::new(
            forecasts.clone(),
            Some(prices),
            EvaluatorConfig::default(),
        );
        let report = evaluator.evaluate_due(now).await.unwrap();

        assert_eq!(report, SweepReport { scored: 1, skipped: 1 });
        assert_eq!(
            forecasts.get(observable).unwrap().unwrap().accuracy_score,
            Some(dec!(75))
        );
        assert!(forecasts.get(unobservable).unwrap().unwrap().accuracy_score.is_none());
        assert!(forecasts.get(future).unwrap().unwrap().accuracy_score.is_none());

        assert_eq!(
            evaluator.score_and_persist(observable).await.unwrap(),
            ScoreOutcome::NoOp
        );
        assert!(matches!(
            evaluator.score_and_persist(unobservable).await,
            Err(GoldError::Alignment(_))
        ));
        assert!(matches!(
            evaluator.score_and_persist(future).await,
            Err(GoldError::Alignment(_))
        ));
    }
}

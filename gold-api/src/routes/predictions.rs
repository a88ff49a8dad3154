//! Forecast listing and scoring endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use gold_core::{Horizon, ObservedPoint};
use gold_services::{ForecastStore, PredictionAccuracyEvaluator, ScoreOutcome};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::{failure, status_for};
use crate::views::{money, ForecastView, HorizonStatsView};
use crate::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    pub timeframe: Option<String>,
    pub limit: Option<usize>,
}

/// One actual price supplied by the caller
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedInput {
    pub label: String,
    pub observed_at: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ObservedRequest {
    pub observed: Vec<ObservedInput>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ai-predictions", get(list_predictions))
        .route("/ai-predictions/{id}/score", post(score_prediction))
        .route("/ai-predictions/{id}/observed", post(score_with_observed))
}

fn forecast_store(state: &AppState) -> Result<&Arc<ForecastStore>, axum::response::Response> {
    state.forecasts.as_ref().ok_or_else(|| {
        failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not configured",
            "set GOLD_DB_PATH to record forecasts",
        )
    })
}

fn evaluator(state: &AppState) -> Result<&Arc<PredictionAccuracyEvaluator>, axum::response::Response> {
    state.evaluator.as_ref().ok_or_else(|| {
        failure(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not configured",
            "set GOLD_DB_PATH to score forecasts",
        )
    })
}

/// GET /api/ai-predictions - Recent forecasts for a horizon plus accuracy stats
async fn list_predictions(
    State(state): State<AppState>,
    Query(params): Query<PredictionsQuery>,
) -> axum::response::Response {
    let store = match forecast_store(&state) {
        Ok(store) => store,
        Err(response) => return response,
    };

    let requested = params.timeframe.unwrap_or_else(|| "24h".to_string());
    let Some(horizon) = Horizon::from_str(&requested) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Invalid timeframe",
            format!("expected 24h, 7d or 1m, got {}", requested),
        );
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let result = store
        .recent(horizon, limit)
        .and_then(|records| store.stats().map(|stats| (records, stats)));

    match result {
        Ok((records, stats)) => {
            let predictions: Vec<ForecastView> = records.iter().map(ForecastView::from).collect();
            let stats: Vec<HorizonStatsView> = stats.iter().map(HorizonStatsView::from).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "data": {
                        "predictions": predictions,
                        "stats": stats,
                        "timeframe": horizon.as_str(),
                        "limit": limit,
                    },
                    "timestamp": Utc::now(),
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to load forecasts: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load forecasts", e)
        }
    }
}

/// POST /api/ai-predictions/{id}/score - Score against persisted snapshots
async fn score_prediction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let evaluator = match evaluator(&state) {
        Ok(evaluator) => evaluator,
        Err(response) => return response,
    };

    outcome_response(id, evaluator.score_and_persist(id).await)
}

/// POST /api/ai-predictions/{id}/observed - Score against caller-supplied prices
async fn score_with_observed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ObservedRequest>,
) -> axum::response::Response {
    let evaluator = match evaluator(&state) {
        Ok(evaluator) => evaluator,
        Err(response) => return response,
    };

    let observed = request
        .observed
        .into_iter()
        .map(|p| ObservedPoint {
            label: p.label,
            observed_at: p.observed_at,
            price: p.price,
        })
        .collect();

    outcome_response(id, evaluator.score_with_observed(id, observed).await)
}

fn outcome_response(
    id: i64,
    result: gold_core::GoldResult<ScoreOutcome>,
) -> axum::response::Response {
    match result {
        Ok(ScoreOutcome::Scored(score)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": { "id": id, "outcome": "scored", "accuracyScore": money(score) },
                "timestamp": Utc::now(),
            })),
        )
            .into_response(),
        Ok(ScoreOutcome::NoOp) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "data": { "id": id, "outcome": "noop" },
                "timestamp": Utc::now(),
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to score forecast {}: {}", id, e);
            failure(status_for(&e), "Failed to score forecast", e)
        }
    }
}

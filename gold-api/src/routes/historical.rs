//! Historical series endpoint

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use gold_core::Horizon;
use serde::Deserialize;
use tracing::error;

use super::{failure, status_for};
use crate::views::series_views;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    /// "24h", "7d" or "1m"
    pub timeframe: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/historical", get(get_historical))
}

/// GET /api/historical - Primary-instrument prices and stats over a window
async fn get_historical(
    State(state): State<AppState>,
    Query(params): Query<HistoricalQuery>,
) -> impl IntoResponse {
    let requested = params.timeframe.unwrap_or_else(|| "24h".to_string());
    let Some(window) = Horizon::from_str(&requested) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "Invalid timeframe",
            format!("expected 24h, 7d or 1m, got {}", requested),
        );
    };

    match state.market.get_historical_series(window).await {
        Ok(series) => {
            let (points, stats) = series_views(&series);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "data": points,
                    "stats": stats,
                    "timeframe": window.as_str(),
                    "timestamp": Utc::now(),
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to load historical series: {}", e);
            failure(status_for(&e), "Failed to fetch historical data", e)
        }
    }
}

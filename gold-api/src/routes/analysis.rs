//! Market analysis endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use gold_research::fallback_analysis;
use tracing::error;

use crate::views::AnalysisView;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/analysis", get(get_analysis))
}

/// GET /api/analysis - Cached AI analysis of the gold market
async fn get_analysis(State(state): State<AppState>) -> impl IntoResponse {
    match state.analysis.get_analysis(false).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": !report.degraded,
                "data": AnalysisView::from(&report.analysis),
                "source": report.source,
                "degraded": report.degraded,
                "cachedAt": report.captured_at,
                "timestamp": Utc::now(),
            })),
        ),
        Err(e) => {
            error!("Failed to produce analysis: {}", e);
            let now = Utc::now();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": false,
                    "data": AnalysisView::from(&fallback_analysis(now)),
                    "source": "static_fallback",
                    "degraded": true,
                    "error": e.to_string(),
                    "timestamp": now,
                })),
            )
        }
    }
}

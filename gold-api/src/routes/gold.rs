//! Current price endpoint

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use gold_core::{MarketSnapshot, SnapshotSource};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::views::SnapshotView;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldQuery {
    /// `true` skips both cache tiers
    pub clear_cache: Option<String>,
}

#[derive(Debug, Serialize)]
struct GoldResponse {
    success: bool,
    data: SnapshotView,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/gold", get(get_gold))
}

/// GET /api/gold - Current snapshot.
/// A failed request still carries a structurally complete all-zero snapshot.
async fn get_gold(
    State(state): State<AppState>,
    Query(params): Query<GoldQuery>,
) -> impl IntoResponse {
    let force_refresh = params.clear_cache.as_deref() == Some("true");

    match state.market.get_snapshot(force_refresh).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(GoldResponse {
                success: true,
                data: SnapshotView::from(&snapshot),
                error: None,
                message: None,
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            error!("Failed to fetch gold prices: {}", e);
            let now = Utc::now();
            let placeholder = MarketSnapshot::empty(now, SnapshotSource::Default);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(GoldResponse {
                    success: false,
                    data: SnapshotView::from(&placeholder),
                    error: Some("Failed to fetch gold prices"),
                    message: Some(e.to_string()),
                    timestamp: now,
                }),
            )
        }
    }
}

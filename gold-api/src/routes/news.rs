//! Headline endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use gold_news::StaticHeadlines;
use tracing::error;

use crate::views::HeadlineView;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/news", get(get_news))
}

/// GET /api/news - Cached market headlines
/// Always 200; a failure serves the built-in headlines with `success: false`
async fn get_news(State(state): State<AppState>) -> impl IntoResponse {
    match state.news.get_headlines(false).await {
        Ok(feed) => {
            let count = feed.headlines.len();
            let data: Vec<HeadlineView> =
                feed.headlines.into_iter().map(HeadlineView::from).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": true,
                    "data": data,
                    "source": feed.source,
                    "count": count,
                    "cachedAt": feed.captured_at,
                    "timestamp": Utc::now(),
                })),
            )
        }
        Err(e) => {
            error!("Failed to fetch headlines: {}", e);
            let data: Vec<HeadlineView> = StaticHeadlines::headlines_at(Utc::now())
                .into_iter()
                .map(HeadlineView::from)
                .collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": false,
                    "data": data,
                    "source": "fallback",
                    "error": e.to_string(),
                    "timestamp": Utc::now(),
                })),
            )
        }
    }
}

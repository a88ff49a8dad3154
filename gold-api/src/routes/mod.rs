//! API route definitions

mod analysis;
mod gold;
mod health;
mod historical;
mod news;
mod predictions;

use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use chrono::Utc;
use gold_core::GoldError;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(gold::routes())
        .merge(historical::routes())
        .merge(news::routes())
        .merge(analysis::routes())
        .merge(predictions::routes())
        .merge(health::routes())
}

/// Status code a pipeline error surfaces as
fn status_for(error: &GoldError) -> StatusCode {
    match error {
        GoldError::NotFound(_) => StatusCode::NOT_FOUND,
        GoldError::Alignment(_) => StatusCode::CONFLICT,
        GoldError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        GoldError::ScrapeFailed(_) | GoldError::RecomputeFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{success: false, error, message, timestamp}` body
fn failure(status: StatusCode, error: &str, message: impl ToString) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": error,
            "message": message.to_string(),
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}

//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    persistence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stored_snapshots: Option<usize>,
}

/// Health check handler. Degraded when the configured database cannot be read.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(prices) = state.prices.as_ref() else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                persistence: false,
                stored_snapshots: None,
            }),
        );
    };

    match prices.count() {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                persistence: true,
                stored_snapshots: Some(count),
            }),
        ),
        Err(e) => {
            warn!("Health check could not read price store: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    persistence: true,
                    stored_snapshots: None,
                }),
            )
        }
    }
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}

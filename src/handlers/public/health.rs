// handlers/public/health.rs - GET /health handler

use axum::{extract::State, http::StatusCode};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::bounded;
use crate::middleware::ApiResponse;

/// GET /health - Liveness plus a storage round trip
///
/// Answers 200 when storage responds, 503 otherwise. The storage error is
/// logged, not returned.
pub async fn health_get(State(state): State<AppState>) -> ApiResponse<Value> {
    let now = chrono::Utc::now();

    match bounded(state.operation_timeout, "ping", state.storage.ping()).await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::degraded(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

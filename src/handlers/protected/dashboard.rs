// handlers/protected/dashboard.rs - GET /api/v1/dashboard handler

use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::BearerToken;
use crate::services::ProjectedRow;

/// GET /api/v1/dashboard - Latest sector rotation analysis for the caller
///
/// The field set and row count depend on the caller's subscription tier,
/// which is read from their account on every request and never from input.
///
/// Expected Output (PRO):
/// ```json
/// [
///   {
///     "analysis_date": "2025-01-06",
///     "rank": 1,
///     "sector": "MINING",
///     "score": 81.8,
///     "signal": "Overweight",
///     "market_context": "...",
///     "phase_and_health": "...",
///     "rationale_and_elliott_wave": "...",
///     "risk_and_volume_profile": "...",
///     "execution_protocol": "...",
///     "top_3_tickers": "...",
///     "sector_portfolio_percentage": 18.0,
///     "week_targets": "..."
///   }
/// ]
/// ```
///
/// FREE callers get at most four rows with only the first five fields.
///
/// Errors: 401 for any credential problem, 404 when no analysis exists,
/// 500 for account or storage failures.
pub async fn dashboard_get(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<Vec<ProjectedRow>>, ApiError> {
    let dashboard = state.feed.dashboard(&token).await?;
    tracing::debug!(tier = %dashboard.tier, rows = dashboard.rows.len(), "Sending dashboard");
    Ok(Json(dashboard.rows))
}

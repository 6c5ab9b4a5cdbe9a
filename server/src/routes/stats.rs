//! Aggregate statistics and the health probe.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use phish_store::IntakeStore;
use tracing::error;

use crate::models::{HealthResponse, RiskLabel, StatsResponse};
use crate::routes::storage_failure;
use crate::AppState;

/// Intake volume counters with a coarse risk grade.
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Aggregate counters", body = StatsResponse)
    )
)]
pub async fn stats(State(state): State<AppState>) -> Response {
    match state.store.counts().await {
        Ok(counts) => Json(StatsResponse {
            reports: counts.reports,
            redirects: counts.redirects,
            total: counts.total(),
            risk: RiskLabel::from_total(counts.total()),
            last_updated: Utc::now(),
        })
        .into_response(),
        Err(e) => storage_failure("Failed to fetch statistics", &e),
    }
}

/// Liveness probe covering both storage tiers.
///
/// Counts come from the local tier, which keeps working when the primary is
/// down; the response stays `healthy` as long as that fallback answers. The
/// primary's reachability is reported separately.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "stats",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Local storage unavailable", body = ErrorBody)
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    let primary_status = state.store.primary_status().await.map(str::to_string);

    match state.store.secondary().counts().await {
        Ok(counts) => Json(HealthResponse {
            status: "healthy".to_string(),
            storage: state.store.storage_label().to_string(),
            primary_status,
            reports: counts.reports,
            redirects: counts.redirects,
            timestamp: Utc::now(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "local storage probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "error": "Local storage unavailable",
                })),
            )
                .into_response()
        }
    }
}

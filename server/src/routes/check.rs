//! URL safety check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use crate::models::{CheckUrlRequest, CheckUrlResponse, ErrorBody};
use crate::AppState;

/// Evaluates a URL through the risk pipeline.
///
/// The endpoint always answers 200 once it has a URL to work with; upstream
/// intelligence failures degrade to the heuristic verdict instead of
/// surfacing as errors, so a flaky network never blocks a page load.
#[utoipa::path(
    post,
    path = "/api/check-url",
    tag = "check",
    request_body = CheckUrlRequest,
    responses(
        (status = 200, description = "Risk verdict for the URL", body = CheckUrlResponse),
        (status = 400, description = "URL missing or blank", body = ErrorBody)
    )
)]
pub async fn check_url(
    State(state): State<AppState>,
    Json(request): Json<CheckUrlRequest>,
) -> Response {
    let url = request.url.trim();
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "URL is required".to_string(),
            }),
        )
            .into_response();
    }

    let verdict = state.checker.check(url).await;
    info!(url, safe = verdict.safe, source = ?verdict.source, "url checked");
    Json(CheckUrlResponse::from_verdict(&verdict)).into_response()
}

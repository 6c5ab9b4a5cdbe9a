//! Service info root and the 404 fallback.

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::Json;

use crate::models::{EndpointMap, NotFoundBody, ServiceInfo};
use crate::AppState;

/// Service banner with a route map, served at the root.
#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses(
        (status = 200, description = "Service info", body = ServiceInfo)
    )
)]
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "online".to_string(),
        service: "ZeroPhish Backend".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.store.storage_label().to_string(),
        endpoints: EndpointMap::default(),
    })
}

/// Catch-all for unknown routes.
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, Json<NotFoundBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            error: "Endpoint not found".to_string(),
            path: uri.path().to_string(),
            method: method.to_string(),
        }),
    )
}

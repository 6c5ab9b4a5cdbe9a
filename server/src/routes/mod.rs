//! HTTP route handlers.
//!
//! Handlers stay thin: validation and wire mapping here, behavior in the
//! `phish-intel` and `phish-store` crates. Storage failures that survive the
//! fallback tier are logged in full and answered with a generic body.

pub mod check;
pub mod intake;
pub mod service;
pub mod stats;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use phish_common::PhishError;
use tracing::error;

use crate::models::{ErrorBody, RejectBody};

/// 500 with a plain `{error}` body, full detail only in the log.
pub(crate) fn storage_failure(what: &str, e: &PhishError) -> Response {
    error!(error = %e, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: what.to_string(),
        }),
    )
        .into_response()
}

/// 500 with a `{success: false, error}` body for the intake endpoints.
pub(crate) fn intake_failure(what: &str, e: &PhishError) -> Response {
    error!(error = %e, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(RejectBody::new(what)),
    )
        .into_response()
}

//! Report and redirect intake plus the listing endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use phish_common::RedirectRecord;
use phish_store::IntakeStore;
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::{
    LogEntry, LogList, RedirectAccepted, RedirectList, RedirectRequest, RejectBody,
    ReportAccepted, ReportList, ReportRequest,
};
use crate::routes::{intake_failure, storage_failure};
use crate::AppState;

/// Default page size of the report and redirect listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;
/// Default page size of the merged activity feed.
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Listing page size. Zero and absent both mean the default.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    /// Maximum entries to return.
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(default)
    }
}

/// Accepts a phishing report from the extension or dashboard.
#[utoipa::path(
    post,
    path = "/api/report",
    tag = "intake",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report stored", body = ReportAccepted),
        (status = 400, description = "URL missing or blank", body = RejectBody)
    )
)]
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Response {
    if request.url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectBody::new("URL is required")),
        )
            .into_response();
    }

    let report = request.into_report();
    if let Err(e) = state.store.insert_report(&report).await {
        return intake_failure("Failed to save report", &e);
    }

    info!(url = %report.url, id = %report.id, "report stored");
    Json(ReportAccepted {
        success: true,
        storage: state.store.storage_label().to_string(),
        message: "Report saved".to_string(),
        id: report.id,
        timestamp: report.timestamp,
        report,
    })
    .into_response()
}

/// Accepts a suspicious redirect chain observed by the extension.
#[utoipa::path(
    post,
    path = "/api/redirect",
    tag = "intake",
    request_body = RedirectRequest,
    responses(
        (status = 200, description = "Chain stored", body = RedirectAccepted),
        (status = 400, description = "Chain missing or empty", body = RejectBody)
    )
)]
pub async fn submit_redirect(
    State(state): State<AppState>,
    Json(request): Json<RedirectRequest>,
) -> Response {
    if request.chain.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RejectBody::new("Valid redirect chain is required")),
        )
            .into_response();
    }

    let record = RedirectRecord::new(request.chain);
    if let Err(e) = state.store.insert_redirect(&record).await {
        return intake_failure("Failed to log redirect chain", &e);
    }

    info!(id = %record.id, hops = record.chain.len(), "redirect chain stored");
    Json(RedirectAccepted {
        success: true,
        id: record.id,
        chain_length: record.chain.len(),
    })
    .into_response()
}

/// Lists stored reports, newest first.
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "intake",
    params(("limit" = Option<usize>, Query, description = "Maximum entries to return, default 20")),
    responses(
        (status = 200, description = "Stored reports", body = ReportList)
    )
)]
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.resolve(DEFAULT_LIST_LIMIT);
    match state.store.reports(limit).await {
        Ok(reports) => Json(ReportList {
            count: reports.len(),
            reports,
        })
        .into_response(),
        Err(e) => storage_failure("Failed to fetch reports", &e),
    }
}

/// Lists stored redirect chains, newest first.
#[utoipa::path(
    get,
    path = "/api/redirects",
    tag = "intake",
    params(("limit" = Option<usize>, Query, description = "Maximum entries to return, default 20")),
    responses(
        (status = 200, description = "Stored redirect chains", body = RedirectList)
    )
)]
pub async fn list_redirects(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.resolve(DEFAULT_LIST_LIMIT);
    match state.store.redirects(limit).await {
        Ok(redirects) => Json(RedirectList {
            count: redirects.len(),
            redirects,
        })
        .into_response(),
        Err(e) => storage_failure("Failed to fetch redirects", &e),
    }
}

/// Merged activity feed of reports and redirect chains.
///
/// `count` is the total number of stored events, not the page size, so
/// dashboards can show "N of M" without a second request.
#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "intake",
    params(("limit" = Option<usize>, Query, description = "Maximum entries to return, default 50")),
    responses(
        (status = 200, description = "Merged activity feed", body = LogList)
    )
)]
pub async fn list_logs(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> Response {
    let limit = query.resolve(DEFAULT_LOG_LIMIT);

    let (reports, redirects) = match tokio::join!(
        state.store.reports(limit),
        state.store.redirects(limit)
    ) {
        (Ok(reports), Ok(redirects)) => (reports, redirects),
        (Err(e), _) | (_, Err(e)) => return storage_failure("Failed to fetch logs", &e),
    };

    let mut logs: Vec<LogEntry> = reports
        .into_iter()
        .map(LogEntry::Report)
        .chain(redirects.into_iter().map(LogEntry::Redirect))
        .collect();
    logs.sort_by_key(|entry| std::cmp::Reverse(entry.timestamp()));

    let count = match state.store.counts().await {
        Ok(counts) => counts.total() as usize,
        Err(e) => {
            debug!(error = %e, "count lookup failed, using fetched length");
            logs.len()
        }
    };
    logs.truncate(limit);

    Json(LogList { logs, count, limit }).into_response()
}

//! ZeroPhish Backend
//!
//! REST backend behind the browser extension and the reporting dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ZEROPHISH BACKEND                       │
//! │                                                              │
//! │   POST /api/check-url ──► UrlChecker                         │
//! │                           cache ► heuristics ► Safe Browsing │
//! │                                                              │
//! │   POST /api/report ─────► FallbackStore                      │
//! │   POST /api/redirect      hosted primary ► local db.json     │
//! │                           (unsynced records replayed)        │
//! │                                                              │
//! │   GET  /api/{stats,logs,reports,redirects,health}            │
//! │   GET  /docs  (Swagger UI)                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod models;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use phish_intel::{RiskCache, SafeBrowsingClient, UrlChecker};
use phish_store::{FallbackStore, FileStore, HostedStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::ServerConfig;

/// Maximum accepted request body, sized for screenshot data URLs.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    /// URL risk pipeline.
    pub checker: Arc<UrlChecker>,
    /// Tiered intake storage.
    pub store: Arc<FallbackStore>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ZeroPhish API",
        description = "Phishing protection backend: URL risk checks, report intake and dashboard feeds",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::service::service_info,
        routes::check::check_url,
        routes::intake::submit_report,
        routes::intake::submit_redirect,
        routes::intake::list_reports,
        routes::intake::list_redirects,
        routes::intake::list_logs,
        routes::stats::stats,
        routes::stats::health,
    ),
    components(
        schemas(
            models::CheckUrlRequest, models::CheckUrlResponse,
            models::ReportRequest, models::ReportAccepted,
            models::RedirectRequest, models::RedirectAccepted,
            models::ReportList, models::RedirectList, models::LogList,
            models::StatsResponse, models::RiskLabel, models::HealthResponse,
            models::ServiceInfo, models::EndpointMap,
            models::ErrorBody, models::RejectBody, models::NotFoundBody
        )
    ),
    tags(
        (name = "service", description = "Service discovery"),
        (name = "check", description = "URL safety checks"),
        (name = "intake", description = "Report and redirect chain intake"),
        (name = "stats", description = "Counters and health probes")
    )
)]
pub struct ApiDoc;

/// Assembles the shared state from configuration.
pub fn build_state(config: &ServerConfig) -> AppState {
    let cache = RiskCache::new(
        phish_intel::cache::DEFAULT_CAPACITY,
        Duration::from_secs(config.cache_ttl_secs),
    );
    let external = config.safe_browsing().map(SafeBrowsingClient::new);
    if external.is_none() {
        warn!("no Safe Browsing key configured, URL checks are heuristic-only");
    }

    let primary = config.hosted_store().map(HostedStore::new);
    let store = FallbackStore::new(primary, FileStore::new(&config.db_file));
    info!(storage = store.storage_label(), "intake storage ready");

    AppState {
        checker: Arc::new(UrlChecker::new(cache, external)),
        store: Arc::new(store),
    }
}

/// Builds the router with every route and layer applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(routes::service::service_info))
        .route("/api/check-url", post(routes::check::check_url))
        .route("/api/report", post(routes::intake::submit_report))
        .route("/api/redirect", post(routes::intake::submit_redirect))
        .route("/api/reports", get(routes::intake::list_reports))
        .route("/api/redirects", get(routes::intake::list_redirects))
        .route("/api/logs", get(routes::intake::list_logs))
        .route("/api/stats", get(routes::stats::stats))
        .route("/api/health", get(routes::stats::health))
        .fallback(routes::service::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically replays unsynced local records against the primary store.
///
/// Runs forever; meant to be spawned. A pass that hits a dead primary stops
/// early and retries whole on the next tick.
pub async fn run_sync_loop(store: Arc<FallbackStore>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match store.sync_unsynced().await {
            Ok(outcome) if outcome.synced > 0 => {
                info!(
                    synced = outcome.synced,
                    pending = outcome.pending,
                    "replayed locally stored records"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "sync pass failed"),
        }
    }
}

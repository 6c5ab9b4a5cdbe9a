//! ZeroPhish Backend - Main Entry Point

use std::sync::Arc;

use phish_store::IntakeStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zerophish_server::{build_router, build_state, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ZeroPhish Backend v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env()?;
    let state = build_state(&config);

    // Seed the local database so the first read never races the first write.
    state.store.secondary().init().await?;

    if let Err(e) = state.store.counts().await {
        tracing::warn!(error = %e, "storage probe failed at startup");
    }

    tokio::spawn(zerophish_server::run_sync_loop(
        Arc::clone(&state.store),
        config.sync_interval_secs,
    ));

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

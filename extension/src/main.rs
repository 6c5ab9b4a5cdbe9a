//! ZeroPhish Extension - Main Entry Point
//!
//! Drives the full runtime against a scripted browser shell: a page load
//! with an automatic scan, a user-submitted phishing report, a redirect
//! burst that raises the warning overlay, and the blocked-page exit. Works
//! with or without a backend listening; without one every verdict fails
//! open and reports stay queued locally.

use std::sync::Arc;
use std::time::Duration;

use phish_common::{NavigationEvent, TabId, Transition};
use phish_guard::{OverlayState, ShieldStatus};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zerophish_extension::protocol::{
    BackgroundRequest, BackgroundResponse, BrowserCommand, BrowserEvent, PageCapture,
    RequestEnvelope,
};
use zerophish_extension::{
    BackendApi, BackgroundContext, ContentContext, ExtensionConfig, GuardView, HttpBackend,
    NoticeRouter, UserAction,
};

const PAGE_URL: &str = "https://promo.example/landing";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("ZeroPhish Extension v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ExtensionConfig::from_env();
    // Snappier pacing for the walkthrough.
    config.scan_delay_ms = 200;
    config.countdown_start_secs = 1.5;
    info!(backend = %config.backend_url, "runtime configured");

    let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(config.backend_url.clone()));

    let (events_tx, events_rx) = mpsc::channel(64);
    let (requests_tx, requests_rx) = mpsc::channel(64);
    let (browser_tx, mut browser_rx) = mpsc::channel(16);
    let (content_tx, content_rx) = mpsc::channel(16);

    let background = BackgroundContext::new(
        api,
        browser_tx,
        content_tx,
        config.queue_capacity,
        format!("zerophish-extension/{}", env!("CARGO_PKG_VERSION")),
    );
    tokio::spawn(background.run(events_rx, requests_rx));

    // Browser shell stand-in: closes tabs and answers screenshot requests.
    tokio::spawn(async move {
        while let Some(command) = browser_rx.recv().await {
            match command {
                BrowserCommand::CloseTab(tab) => info!(%tab, "browser shell: tab closed"),
                BrowserCommand::CaptureVisibleTab { tab, reply } => {
                    info!(%tab, "browser shell: screenshot requested");
                    let _ = reply.send(None);
                }
            }
        }
    });

    let tab = TabId(7);
    let mut router = NoticeRouter::new();
    let notices_rx = router.register(tab);
    tokio::spawn(router.run(content_rx));

    let (actions_tx, actions_rx) = mpsc::channel(8);
    let (content, mut view_rx) = ContentContext::new(
        tab,
        PAGE_URL,
        &config,
        requests_tx.clone(),
        notices_rx,
        actions_rx,
    );
    let panel = content.security_report();
    info!(domain = %panel.domain, encrypted = panel.encrypted, "shield panel ready");
    tokio::spawn(content.run());

    let resolved = wait_until(&mut view_rx, |v| v.shield != ShieldStatus::Unknown).await?;
    info!(shield = ?resolved.shield, "page scan resolved");

    // The user reports the page from the shield menu.
    let mut capture = PageCapture::for_url(PAGE_URL);
    capture.title = Some("Claim your prize".into());

    let (reply_tx, reply_rx) = oneshot::channel();
    requests_tx
        .send(RequestEnvelope {
            tab,
            request: BackgroundRequest::ReportPhishing { data: capture },
            reply: reply_tx,
        })
        .await?;
    match reply_rx.await? {
        BackgroundResponse::ReportOutcome { synced, id, .. } => {
            info!(%id, synced, "report captured")
        }
        other => warn!(?other, "unexpected reply to report"),
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    requests_tx
        .send(RequestEnvelope {
            tab,
            request: BackgroundRequest::GetLocalReports,
            reply: reply_tx,
        })
        .await?;
    if let BackgroundResponse::LocalReports { reports } = reply_rx.await? {
        info!(queued = reports.len(), "local report queue");
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    requests_tx
        .send(RequestEnvelope {
            tab,
            request: BackgroundRequest::SyncReports,
            reply: reply_tx,
        })
        .await?;
    if let BackgroundResponse::SyncOutcome { synced, total } = reply_rx.await? {
        info!(synced, total, "sync pass finished");
    }

    // A redirect burst lands the tab on a new page.
    for (url, transition) in [
        (PAGE_URL, Transition::Normal),
        ("https://track.promo-click.example/go", Transition::ServerRedirect),
        ("https://win-a-prize.example/claim", Transition::ClientRedirect),
    ] {
        events_tx
            .send(BrowserEvent::Navigation(NavigationEvent::main_frame(
                tab, url, transition,
            )))
            .await?;
    }

    let warned = wait_until(&mut view_rx, |v| {
        matches!(v.overlay, OverlayState::Warning { .. })
    })
    .await?;
    if let OverlayState::Warning { countdown, .. } = &warned.overlay {
        info!(remaining = %countdown.display(), "warning overlay raised");
    }

    wait_until(&mut view_rx, |v| v.overlay == OverlayState::Blocked).await?;
    info!("grace period over, page blocked");

    actions_tx.send(UserAction::BackToSafety).await?;
    wait_until(&mut view_rx, |v| v.overlay == OverlayState::Hidden).await?;
    info!("user chose back to safety");

    // Give the shell a moment to log the tab close.
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("walkthrough complete");

    Ok(())
}

async fn wait_until<F>(
    view_rx: &mut watch::Receiver<GuardView>,
    mut pred: F,
) -> Result<GuardView, tokio::sync::watch::error::RecvError>
where
    F: FnMut(&GuardView) -> bool,
{
    loop {
        {
            let view = view_rx.borrow_and_update();
            if pred(&view) {
                return Ok((*view).clone());
            }
        }
        view_rx.changed().await?;
    }
}

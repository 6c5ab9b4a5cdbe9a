//! Content-side protection loop.
//!
//! One [`ContentContext`] runs per guarded page. It drives the page's
//! [`PageGuard`] from four inputs: the delayed URL scan, the verdict reply
//! from the background, routed notices, and user actions from the overlay
//! UI. Every state change is published on a watch channel so the rendering
//! side only ever redraws on real transitions.

use std::collections::HashMap;
use std::time::Duration;

use phish_common::TabId;
use phish_guard::{OverlayState, PageGuard, ShieldReport, ShieldStatus, TICK};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval};
use tracing::{debug, info};

use crate::config::ExtensionConfig;
use crate::protocol::{
    BackgroundRequest, BackgroundResponse, ContentNotice, PageCapture, RequestEnvelope, TabNotice,
};

/// User interactions with the protection UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// "I Trust This Site" on the warning overlay.
    Trust,
    /// "Leave Site" on the warning overlay.
    Leave,
    /// "Back to Safety" on the blocked screen.
    BackToSafety,
    /// Report the current page as phishing.
    ReportPage,
}

/// Published snapshot of what the page currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardView {
    /// Shield badge status.
    pub shield: ShieldStatus,
    /// Overlay lifecycle state.
    pub overlay: OverlayState,
    /// Whether the suspicious banner is up.
    pub banner: bool,
}

/// Fans background notices out to per-tab content loops.
pub struct NoticeRouter {
    tabs: HashMap<TabId, mpsc::Sender<ContentNotice>>,
}

impl NoticeRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self {
            tabs: HashMap::new(),
        }
    }

    /// Registers a tab and returns the receiver its content loop reads.
    pub fn register(&mut self, tab: TabId) -> mpsc::Receiver<ContentNotice> {
        let (tx, rx) = mpsc::channel(8);
        self.tabs.insert(tab, tx);
        rx
    }

    /// Routing loop. Notices for unknown or finished tabs are dropped.
    pub async fn run(self, mut notices: mpsc::Receiver<TabNotice>) {
        while let Some(TabNotice { tab, notice }) = notices.recv().await {
            match self.tabs.get(&tab) {
                Some(tx) => {
                    if tx.send(notice).await.is_err() {
                        debug!(%tab, "content loop gone, notice dropped");
                    }
                }
                None => debug!(%tab, "no content loop registered for tab"),
            }
        }
    }
}

impl Default for NoticeRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Protection driver for one page.
pub struct ContentContext {
    tab: TabId,
    guard: PageGuard,
    requests_tx: mpsc::Sender<RequestEnvelope>,
    notices_rx: mpsc::Receiver<ContentNotice>,
    actions_rx: mpsc::Receiver<UserAction>,
    status_tx: watch::Sender<GuardView>,
    scan_delay: Duration,
}

impl ContentContext {
    /// Context for a page, plus the watch handle the UI renders from.
    pub fn new(
        tab: TabId,
        url: impl Into<String>,
        config: &ExtensionConfig,
        requests_tx: mpsc::Sender<RequestEnvelope>,
        notices_rx: mpsc::Receiver<ContentNotice>,
        actions_rx: mpsc::Receiver<UserAction>,
    ) -> (Self, watch::Receiver<GuardView>) {
        let guard = PageGuard::with_countdown(url, config.countdown_start_secs);
        let (status_tx, status_rx) = watch::channel(GuardView {
            shield: guard.shield(),
            overlay: guard.overlay().clone(),
            banner: guard.banner(),
        });

        (
            Self {
                tab,
                guard,
                requests_tx,
                notices_rx,
                actions_rx,
                status_tx,
                scan_delay: Duration::from_millis(config.scan_delay_ms),
            },
            status_rx,
        )
    }

    /// Shield panel summary for the guarded page.
    pub fn security_report(&self) -> ShieldReport {
        self.guard.security_report()
    }

    /// Drives the page until the notice or action channel closes.
    pub async fn run(mut self) {
        let scan_timer = tokio::time::sleep(self.scan_delay);
        tokio::pin!(scan_timer);
        let mut scanned = false;
        let mut verdict_rx: Option<oneshot::Receiver<BackgroundResponse>> = None;
        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = &mut scan_timer, if !scanned => {
                    scanned = true;
                    if self.guard.fast_scan() {
                        self.publish();
                    } else {
                        verdict_rx = self.request_verdict().await;
                        if verdict_rx.is_none() {
                            self.guard.fail_open();
                            self.publish();
                        }
                    }
                }
                response = maybe_verdict(&mut verdict_rx) => {
                    self.apply_verdict(response);
                    verdict_rx = None;
                    self.publish();
                }
                notice = self.notices_rx.recv() => match notice {
                    Some(notice) => {
                        self.apply_notice(notice);
                        self.publish();
                    }
                    None => break,
                },
                action = self.actions_rx.recv() => match action {
                    Some(action) => {
                        self.apply_action(action).await;
                        self.publish();
                    }
                    None => break,
                },
                _ = maybe_tick(&mut ticker) => {
                    if self.guard.tick() {
                        info!(tab = %self.tab, url = %self.guard.url(), "page blocked");
                    }
                    self.publish();
                }
            }

            // The ticker exists exactly while the overlay is counting down;
            // an existing ticker is kept so re-triggers cannot stretch the
            // grace period.
            ticker = self.refresh_ticker(ticker);
        }
        debug!(tab = %self.tab, "content loop finished");
    }

    async fn request_verdict(&mut self) -> Option<oneshot::Receiver<BackgroundResponse>> {
        let (tx, rx) = oneshot::channel();
        let envelope = RequestEnvelope {
            tab: self.tab,
            request: BackgroundRequest::CheckUrl {
                url: self.guard.url().to_string(),
            },
            reply: tx,
        };
        match self.requests_tx.send(envelope).await {
            Ok(()) => Some(rx),
            Err(_) => {
                debug!(tab = %self.tab, "background gone, verdict unavailable");
                None
            }
        }
    }

    fn apply_verdict(&mut self, response: Option<BackgroundResponse>) {
        match response {
            Some(BackgroundResponse::Verdict(reply)) => {
                self.guard.resolve(reply.shield_status());
            }
            Some(BackgroundResponse::Error { message }) => {
                debug!(tab = %self.tab, %message, "verdict failed");
                self.guard.fail_open();
            }
            _ => self.guard.fail_open(),
        }
    }

    fn apply_notice(&mut self, notice: ContentNotice) {
        match notice {
            ContentNotice::StartSimulation => self.guard.simulate(),
            ContentNotice::TriggerRedirectWarning { chain } => {
                self.guard.redirect_warning(chain.len());
            }
        }
    }

    async fn apply_action(&mut self, action: UserAction) {
        match action {
            UserAction::Trust => self.guard.trust(),
            UserAction::Leave => {
                self.guard.leave();
                self.send_background(BackgroundRequest::CloseTab).await;
            }
            UserAction::BackToSafety => {
                self.guard.back_to_safety();
                self.send_background(BackgroundRequest::CloseTab).await;
            }
            UserAction::ReportPage => {
                let capture = PageCapture::for_url(self.guard.url());
                self.send_background(BackgroundRequest::ReportPhishing { data: capture })
                    .await;
            }
        }
    }

    async fn send_background(&mut self, request: BackgroundRequest) {
        // Fire-and-forget: the reply handle is dropped on purpose.
        let (tx, _rx) = oneshot::channel();
        let envelope = RequestEnvelope {
            tab: self.tab,
            request,
            reply: tx,
        };
        if self.requests_tx.send(envelope).await.is_err() {
            debug!(tab = %self.tab, "background gone, request dropped");
        }
    }

    fn refresh_ticker(&self, ticker: Option<Interval>) -> Option<Interval> {
        match (self.guard.overlay(), ticker) {
            (OverlayState::Warning { .. }, Some(ticker)) => Some(ticker),
            (OverlayState::Warning { .. }, None) => {
                Some(tokio::time::interval_at(Instant::now() + TICK, TICK))
            }
            _ => None,
        }
    }

    fn publish(&self) {
        let _ = self.status_tx.send(GuardView {
            shield: self.guard.shield(),
            overlay: self.guard.overlay().clone(),
            banner: self.guard.banner(),
        });
    }
}

async fn maybe_verdict(
    rx: &mut Option<oneshot::Receiver<BackgroundResponse>>,
) -> Option<BackgroundResponse> {
    match rx {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

async fn maybe_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CheckUrlReply;
    use phish_guard::WarningReason;

    struct Page {
        requests_rx: mpsc::Receiver<RequestEnvelope>,
        notices_tx: mpsc::Sender<ContentNotice>,
        actions_tx: mpsc::Sender<UserAction>,
        view_rx: watch::Receiver<GuardView>,
    }

    fn test_config() -> ExtensionConfig {
        ExtensionConfig {
            countdown_start_secs: 0.03,
            scan_delay_ms: 5,
            ..Default::default()
        }
    }

    fn spawn_page(url: &str) -> Page {
        let (requests_tx, requests_rx) = mpsc::channel(8);
        let (notices_tx, notices_rx) = mpsc::channel(8);
        let (actions_tx, actions_rx) = mpsc::channel(8);

        let (ctx, view_rx) = ContentContext::new(
            TabId(1),
            url,
            &test_config(),
            requests_tx,
            notices_rx,
            actions_rx,
        );
        tokio::spawn(ctx.run());

        Page {
            requests_rx,
            notices_tx,
            actions_tx,
            view_rx,
        }
    }

    async fn wait_for<F>(view_rx: &mut watch::Receiver<GuardView>, mut pred: F) -> GuardView
    where
        F: FnMut(&GuardView) -> bool,
    {
        loop {
            {
                let view = view_rx.borrow_and_update();
                if pred(&view) {
                    return (*view).clone();
                }
            }
            view_rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_page_warns_then_blocks() {
        let mut page = spawn_page("https://landing.example/?phish=true");

        let warned = wait_for(&mut page.view_rx, |v| {
            matches!(v.overlay, OverlayState::Warning { .. })
        })
        .await;
        assert_eq!(warned.shield, ShieldStatus::Phishing);

        let blocked =
            wait_for(&mut page.view_rx, |v| v.overlay == OverlayState::Blocked).await;
        assert_eq!(blocked.shield, ShieldStatus::Phishing);

        // The marker hit made the scan decisive; no verdict was requested.
        assert!(page.requests_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_page_resolves_via_background() {
        let mut page = spawn_page("https://docs.example.org/guide");

        let envelope = page.requests_rx.recv().await.unwrap();
        assert_eq!(
            envelope.request,
            BackgroundRequest::CheckUrl {
                url: "https://docs.example.org/guide".into()
            }
        );
        let _ = envelope.reply.send(BackgroundResponse::Verdict(CheckUrlReply {
            safe: true,
            ..Default::default()
        }));

        let view = wait_for(&mut page.view_rx, |v| v.shield == ShieldStatus::Safe).await;
        assert_eq!(view.overlay, OverlayState::Hidden);
        assert!(!view.banner);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspicious_verdict_raises_banner() {
        let mut page = spawn_page("https://odd.example/login");

        let envelope = page.requests_rx.recv().await.unwrap();
        let _ = envelope.reply.send(BackgroundResponse::Verdict(CheckUrlReply {
            safe: false,
            suspicious: Some(true),
            ..Default::default()
        }));

        let view =
            wait_for(&mut page.view_rx, |v| v.shield == ShieldStatus::Suspicious).await;
        assert!(view.banner);
        assert_eq!(view.overlay, OverlayState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdict_failure_fails_open() {
        let mut page = spawn_page("https://unreachable.example");

        let envelope = page.requests_rx.recv().await.unwrap();
        let _ = envelope.reply.send(BackgroundResponse::Error {
            message: "connection refused".into(),
        });

        let view = wait_for(&mut page.view_rx, |v| v.shield == ShieldStatus::Safe).await;
        assert_eq!(view.overlay, OverlayState::Hidden);

        // A dropped reply channel fails open the same way.
        let mut page = spawn_page("https://silent.example");
        let envelope = page.requests_rx.recv().await.unwrap();
        drop(envelope);
        wait_for(&mut page.view_rx, |v| v.shield == ShieldStatus::Safe).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trust_dismisses_warning_for_session() {
        let mut page = spawn_page("https://bad.example");

        let envelope = page.requests_rx.recv().await.unwrap();
        let _ = envelope.reply.send(BackgroundResponse::Verdict(CheckUrlReply {
            safe: false,
            is_phishing: Some(true),
            ..Default::default()
        }));
        wait_for(&mut page.view_rx, |v| {
            matches!(v.overlay, OverlayState::Warning { .. })
        })
        .await;

        page.actions_tx.send(UserAction::Trust).await.unwrap();
        let view =
            wait_for(&mut page.view_rx, |v| v.overlay == OverlayState::Hidden).await;
        assert_eq!(view.shield, ShieldStatus::Phishing);

        // A later redirect signal stays suppressed.
        page.notices_tx
            .send(ContentNotice::TriggerRedirectWarning {
                chain: vec!["https://a.example".into(), "https://b.example".into()],
            })
            .await
            .unwrap();
        page.actions_tx.send(UserAction::ReportPage).await.unwrap();
        let report = page.requests_rx.recv().await.unwrap();
        assert!(matches!(
            report.request,
            BackgroundRequest::ReportPhishing { .. }
        ));
        assert_eq!(*page.view_rx.borrow(), view);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_closes_tab() {
        let mut page = spawn_page("https://bad.example");

        let envelope = page.requests_rx.recv().await.unwrap();
        let _ = envelope.reply.send(BackgroundResponse::Verdict(CheckUrlReply {
            safe: false,
            is_phishing: Some(true),
            ..Default::default()
        }));
        wait_for(&mut page.view_rx, |v| {
            matches!(v.overlay, OverlayState::Warning { .. })
        })
        .await;

        page.actions_tx.send(UserAction::Leave).await.unwrap();
        let close = page.requests_rx.recv().await.unwrap();
        assert_eq!(close.request, BackgroundRequest::CloseTab);
        assert_eq!(close.tab, TabId(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_notice_blocks_then_back_to_safety() {
        let mut page = spawn_page("https://landing.example");

        // Hold the verdict envelope so the shield stays unresolved.
        let _check = page.requests_rx.recv().await.unwrap();

        page.notices_tx
            .send(ContentNotice::TriggerRedirectWarning {
                chain: vec![
                    "https://start.example".into(),
                    "https://hop1.example".into(),
                    "https://hop2.example".into(),
                ],
            })
            .await
            .unwrap();

        let warned = wait_for(&mut page.view_rx, |v| {
            matches!(
                v.overlay,
                OverlayState::Warning {
                    reason: WarningReason::RedirectChain(3),
                    ..
                }
            )
        })
        .await;
        assert_eq!(warned.shield, ShieldStatus::Unknown);

        wait_for(&mut page.view_rx, |v| v.overlay == OverlayState::Blocked).await;

        page.actions_tx.send(UserAction::BackToSafety).await.unwrap();
        wait_for(&mut page.view_rx, |v| v.overlay == OverlayState::Hidden).await;
        let close = page.requests_rx.recv().await.unwrap();
        assert_eq!(close.request, BackgroundRequest::CloseTab);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_walkthrough() {
        let mut page = spawn_page("https://demo.example");
        let _check = page.requests_rx.recv().await.unwrap();

        page.notices_tx
            .send(ContentNotice::StartSimulation)
            .await
            .unwrap();

        wait_for(&mut page.view_rx, |v| {
            matches!(
                v.overlay,
                OverlayState::Warning {
                    reason: WarningReason::Simulation,
                    ..
                }
            )
        })
        .await;
        wait_for(&mut page.view_rx, |v| v.overlay == OverlayState::Blocked).await;
    }

    #[tokio::test]
    async fn test_router_delivers_to_registered_tab() {
        let mut router = NoticeRouter::new();
        let mut rx7 = router.register(TabId(7));
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(router.run(rx));

        tx.send(TabNotice {
            tab: TabId(7),
            notice: ContentNotice::StartSimulation,
        })
        .await
        .unwrap();
        assert_eq!(rx7.recv().await.unwrap(), ContentNotice::StartSimulation);

        // A notice for an unregistered tab is dropped without blocking.
        tx.send(TabNotice {
            tab: TabId(8),
            notice: ContentNotice::StartSimulation,
        })
        .await
        .unwrap();
        tx.send(TabNotice {
            tab: TabId(7),
            notice: ContentNotice::TriggerRedirectWarning {
                chain: vec!["https://a.example".into()],
            },
        })
        .await
        .unwrap();

        match rx7.recv().await.unwrap() {
            ContentNotice::TriggerRedirectWarning { chain } => assert_eq!(chain.len(), 1),
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn test_security_report_passthrough() {
        let (requests_tx, _requests_rx) = mpsc::channel(1);
        let (_notices_tx, notices_rx) = mpsc::channel(1);
        let (_actions_tx, actions_rx) = mpsc::channel(1);

        let (ctx, _view) = ContentContext::new(
            TabId(1),
            "https://portal.example.com/login",
            &ExtensionConfig::default(),
            requests_tx,
            notices_rx,
            actions_rx,
        );

        let report = ctx.security_report();
        assert_eq!(report.domain, "portal.example.com");
        assert!(report.encrypted);
        assert_eq!(report.status, ShieldStatus::Unknown);
    }
}

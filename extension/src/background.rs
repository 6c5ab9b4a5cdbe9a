//! Background runtime.
//!
//! Owns the per-tab redirect tracker and the local report queue, and is the
//! only component that talks to the backend. Browser events and content-side
//! requests arrive on channels; slow backend calls are spawned off the loop
//! so one stalled request never blocks navigation tracking.

use std::sync::Arc;

use parking_lot::Mutex;
use phish_common::{SuspiciousChain, TabId};
use phish_tracker::ChainStore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::api::BackendApi;
use crate::protocol::{
    BackgroundRequest, BackgroundResponse, BrowserCommand, BrowserEvent, ContentNotice,
    PageCapture, RequestEnvelope, TabNotice,
};
use crate::queue::{LocalQueue, QueuedReport};

/// Background half of the runtime.
pub struct BackgroundContext {
    chains: ChainStore,
    queue: Arc<Mutex<LocalQueue>>,
    api: Arc<dyn BackendApi>,
    browser_tx: mpsc::Sender<BrowserCommand>,
    content_tx: mpsc::Sender<TabNotice>,
    user_agent: String,
}

impl BackgroundContext {
    /// Context wired to the given backend and browser/content channels.
    pub fn new(
        api: Arc<dyn BackendApi>,
        browser_tx: mpsc::Sender<BrowserCommand>,
        content_tx: mpsc::Sender<TabNotice>,
        queue_capacity: usize,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            chains: ChainStore::new(),
            queue: Arc::new(Mutex::new(LocalQueue::new(queue_capacity))),
            api,
            browser_tx,
            content_tx,
            user_agent: user_agent.into(),
        }
    }

    /// Event loop. Runs until both input channels close.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<BrowserEvent>,
        mut requests: mpsc::Receiver<RequestEnvelope>,
    ) {
        info!("background runtime started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                envelope = requests.recv() => match envelope {
                    Some(envelope) => self.handle_request(envelope).await,
                    None => break,
                },
            }
        }
        info!("background runtime stopped");
    }

    async fn handle_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::Navigation(nav) => {
                if let Some(chain) = self.chains.observe(&nav) {
                    self.handle_suspicious_chain(chain).await;
                }
            }
            BrowserEvent::TabRemoved(tab) => self.chains.remove_tab(tab),
        }
    }

    async fn handle_suspicious_chain(&self, chain: SuspiciousChain) {
        warn!(tab = %chain.tab, hops = chain.urls.len(), "suspicious redirect chain");

        let api = Arc::clone(&self.api);
        let urls = chain.urls.clone();
        tokio::spawn(async move {
            if let Err(e) = api.submit_redirect(&urls).await {
                debug!(error = %e, "redirect submission failed");
            }
        });

        let notice = TabNotice {
            tab: chain.tab,
            notice: ContentNotice::TriggerRedirectWarning { chain: chain.urls },
        };
        if self.content_tx.send(notice).await.is_err() {
            debug!("content channel closed, redirect warning dropped");
        }
    }

    async fn handle_request(&self, envelope: RequestEnvelope) {
        let RequestEnvelope { tab, request, reply } = envelope;
        match request {
            BackgroundRequest::CloseTab => {
                let delivered = self
                    .browser_tx
                    .send(BrowserCommand::CloseTab(tab))
                    .await
                    .is_ok();
                let _ = reply.send(BackgroundResponse::Ack { success: delivered });
            }
            BackgroundRequest::CheckUrl { url } => {
                let api = Arc::clone(&self.api);
                tokio::spawn(async move {
                    let response = match api.check_url(&url).await {
                        Ok(verdict) => BackgroundResponse::Verdict(verdict),
                        Err(e) => {
                            debug!(error = %e, "url check failed");
                            BackgroundResponse::Error {
                                message: e.to_string(),
                            }
                        }
                    };
                    let _ = reply.send(response);
                });
            }
            BackgroundRequest::ReportPhishing { data } => {
                self.handle_report(tab, data, reply).await;
            }
            BackgroundRequest::GetLocalReports => {
                let reports = self.queue.lock().all();
                let _ = reply.send(BackgroundResponse::LocalReports { reports });
            }
            BackgroundRequest::SyncReports => self.handle_sync(reply),
        }
    }

    async fn handle_report(
        &self,
        tab: TabId,
        capture: PageCapture,
        reply: oneshot::Sender<BackgroundResponse>,
    ) {
        let (shot_tx, shot_rx) = oneshot::channel();
        let capture_requested = self
            .browser_tx
            .send(BrowserCommand::CaptureVisibleTab {
                tab,
                reply: shot_tx,
            })
            .await
            .is_ok();

        let api = Arc::clone(&self.api);
        let queue = Arc::clone(&self.queue);
        let user_agent = self.user_agent.clone();
        tokio::spawn(async move {
            let screenshot = if capture_requested {
                shot_rx.await.ok().flatten()
            } else {
                None
            };

            let mut report = QueuedReport::new(capture, user_agent);
            report.screenshot = screenshot;
            report.synced = match api.submit_report(&report.submission()).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    debug!(error = %e, "report submission failed, kept locally");
                    false
                }
            };

            let id = report.id;
            let synced = report.synced;
            queue.lock().push(report);
            info!(%id, synced, "phishing report queued");
            let _ = reply.send(BackgroundResponse::ReportOutcome {
                success: true,
                synced,
                id,
            });
        });
    }

    fn handle_sync(&self, reply: oneshot::Sender<BackgroundResponse>) {
        let api = Arc::clone(&self.api);
        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            let pending = queue.lock().unsynced();
            let total = pending.len();
            let mut synced = 0;

            for entry in pending {
                match api.submit_report(&entry.submission()).await {
                    Ok(true) => {
                        queue.lock().mark_synced(entry.id);
                        synced += 1;
                    }
                    Ok(false) => {
                        debug!(id = %entry.id, "backend refused queued report");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "sync halted until backend recovers");
                        break;
                    }
                }
            }

            if synced > 0 {
                info!(synced, total, "queued reports synced");
            }
            let _ = reply.send(BackgroundResponse::SyncOutcome { synced, total });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CheckUrlReply, ReportSubmission};
    use async_trait::async_trait;
    use phish_common::{NavigationEvent, PhishError, PhishResult, Transition};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ScriptedBackend {
        verdict: CheckUrlReply,
        reachable: AtomicBool,
        reports: Mutex<Vec<ReportSubmission>>,
        redirects: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedBackend {
        fn online(verdict: CheckUrlReply) -> Arc<Self> {
            Arc::new(Self {
                verdict,
                reachable: AtomicBool::new(true),
                reports: Mutex::new(Vec::new()),
                redirects: Mutex::new(Vec::new()),
            })
        }

        fn offline() -> Arc<Self> {
            let backend = Self::online(CheckUrlReply::default());
            backend.reachable.store(false, Ordering::SeqCst);
            backend
        }

        fn set_reachable(&self, up: bool) {
            self.reachable.store(up, Ordering::SeqCst);
        }

        fn guard(&self) -> PhishResult<()> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(PhishError::Upstream("connection refused".into()))
            }
        }
    }

    #[async_trait]
    impl BackendApi for ScriptedBackend {
        async fn check_url(&self, _url: &str) -> PhishResult<CheckUrlReply> {
            self.guard()?;
            Ok(self.verdict.clone())
        }

        async fn submit_report(&self, report: &ReportSubmission) -> PhishResult<bool> {
            self.guard()?;
            self.reports.lock().push(report.clone());
            Ok(true)
        }

        async fn submit_redirect(&self, chain: &[String]) -> PhishResult<()> {
            self.guard()?;
            self.redirects.lock().push(chain.to_vec());
            Ok(())
        }
    }

    struct Harness {
        events_tx: mpsc::Sender<BrowserEvent>,
        requests_tx: mpsc::Sender<RequestEnvelope>,
        browser_rx: mpsc::Receiver<BrowserCommand>,
        content_rx: mpsc::Receiver<TabNotice>,
    }

    fn spawn_runtime(api: Arc<ScriptedBackend>) -> Harness {
        let (events_tx, events_rx) = mpsc::channel(8);
        let (requests_tx, requests_rx) = mpsc::channel(8);
        let (browser_tx, browser_rx) = mpsc::channel(8);
        let (content_tx, content_rx) = mpsc::channel(8);

        let ctx = BackgroundContext::new(api, browser_tx, content_tx, 8, "test-agent");
        tokio::spawn(ctx.run(events_rx, requests_rx));

        Harness {
            events_tx,
            requests_tx,
            browser_rx,
            content_rx,
        }
    }

    async fn ask(harness: &Harness, tab: i32, request: BackgroundRequest) -> BackgroundResponse {
        let (tx, rx) = oneshot::channel();
        harness
            .requests_tx
            .send(RequestEnvelope {
                tab: TabId(tab),
                request,
                reply: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    fn nav(tab: i32, url: &str, transition: Transition) -> BrowserEvent {
        BrowserEvent::Navigation(NavigationEvent::main_frame(TabId(tab), url, transition))
    }

    #[tokio::test]
    async fn test_check_url_round_trips_verdict() {
        let verdict = CheckUrlReply {
            safe: true,
            ..Default::default()
        };
        let harness = spawn_runtime(ScriptedBackend::online(verdict));

        let response = ask(
            &harness,
            1,
            BackgroundRequest::CheckUrl {
                url: "https://ok.example".into(),
            },
        )
        .await;

        match response {
            BackgroundResponse::Verdict(reply) => assert!(reply.safe),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_url_failure_becomes_error_reply() {
        let harness = spawn_runtime(ScriptedBackend::offline());

        let response = ask(
            &harness,
            1,
            BackgroundRequest::CheckUrl {
                url: "https://ok.example".into(),
            },
        )
        .await;

        match response {
            BackgroundResponse::Error { message } => {
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_captures_screenshot_and_syncs() {
        let backend = ScriptedBackend::online(CheckUrlReply::default());
        let mut harness = spawn_runtime(Arc::clone(&backend));

        let (tx, rx) = oneshot::channel();
        harness
            .requests_tx
            .send(RequestEnvelope {
                tab: TabId(4),
                request: BackgroundRequest::ReportPhishing {
                    data: PageCapture::for_url("https://fake-bank.example/login"),
                },
                reply: tx,
            })
            .await
            .unwrap();

        // Play the browser shell: answer the screenshot request.
        match harness.browser_rx.recv().await.unwrap() {
            BrowserCommand::CaptureVisibleTab { tab, reply } => {
                assert_eq!(tab, TabId(4));
                reply.send(Some("data:image/png;base64,AAAA".into())).unwrap();
            }
            other => panic!("unexpected command: {other:?}"),
        }

        match rx.await.unwrap() {
            BackgroundResponse::ReportOutcome { success, synced, .. } => {
                assert!(success);
                assert!(synced);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        let submitted = backend.reports.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].url, "https://fake-bank.example/login");
        assert!(submitted[0].screenshot.is_some());
        assert_eq!(submitted[0].user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_offline_report_is_kept_and_synced_later() {
        let backend = ScriptedBackend::offline();
        let mut harness = spawn_runtime(Arc::clone(&backend));

        let (tx, rx) = oneshot::channel();
        harness
            .requests_tx
            .send(RequestEnvelope {
                tab: TabId(2),
                request: BackgroundRequest::ReportPhishing {
                    data: PageCapture::for_url("https://scam.example"),
                },
                reply: tx,
            })
            .await
            .unwrap();

        match harness.browser_rx.recv().await.unwrap() {
            BrowserCommand::CaptureVisibleTab { reply, .. } => {
                reply.send(None).unwrap();
            }
            other => panic!("unexpected command: {other:?}"),
        }

        match rx.await.unwrap() {
            BackgroundResponse::ReportOutcome { success, synced, .. } => {
                assert!(success);
                assert!(!synced);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        match ask(&harness, 2, BackgroundRequest::GetLocalReports).await {
            BackgroundResponse::LocalReports { reports } => {
                assert_eq!(reports.len(), 1);
                assert!(!reports[0].synced);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // Backend recovers; the queued report drains.
        backend.set_reachable(true);
        match ask(&harness, 2, BackgroundRequest::SyncReports).await {
            BackgroundResponse::SyncOutcome { synced, total } => {
                assert_eq!(synced, 1);
                assert_eq!(total, 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        match ask(&harness, 2, BackgroundRequest::GetLocalReports).await {
            BackgroundResponse::LocalReports { reports } => {
                assert!(reports[0].synced);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redirect_burst_warns_tab_and_submits_chain() {
        let backend = ScriptedBackend::online(CheckUrlReply::default());
        let mut harness = spawn_runtime(Arc::clone(&backend));

        harness
            .events_tx
            .send(nav(9, "https://start.example", Transition::Normal))
            .await
            .unwrap();
        harness
            .events_tx
            .send(nav(9, "https://hop1.example", Transition::ServerRedirect))
            .await
            .unwrap();
        harness
            .events_tx
            .send(nav(9, "https://hop2.example", Transition::ClientRedirect))
            .await
            .unwrap();

        let notice = harness.content_rx.recv().await.unwrap();
        assert_eq!(notice.tab, TabId(9));
        match notice.notice {
            ContentNotice::TriggerRedirectWarning { chain } => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain[0], "https://start.example");
            }
            other => panic!("unexpected notice: {other:?}"),
        }

        for _ in 0..100 {
            if !backend.redirects.lock().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let chains = backend.redirects.lock();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 3);
    }

    #[tokio::test]
    async fn test_tab_removal_resets_chain() {
        let backend = ScriptedBackend::online(CheckUrlReply::default());
        let mut harness = spawn_runtime(Arc::clone(&backend));

        harness
            .events_tx
            .send(nav(3, "https://a.example", Transition::ServerRedirect))
            .await
            .unwrap();
        harness
            .events_tx
            .send(nav(3, "https://b.example", Transition::ServerRedirect))
            .await
            .unwrap();
        harness
            .events_tx
            .send(BrowserEvent::TabRemoved(TabId(3)))
            .await
            .unwrap();
        harness
            .events_tx
            .send(nav(3, "https://c.example", Transition::ServerRedirect))
            .await
            .unwrap();

        // Ack round trip drains the event queue before the assertion.
        ask(&harness, 3, BackgroundRequest::GetLocalReports).await;
        assert!(harness.content_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_tab_forwards_to_browser() {
        let mut harness = spawn_runtime(ScriptedBackend::online(CheckUrlReply::default()));

        match ask(&harness, 7, BackgroundRequest::CloseTab).await {
            BackgroundResponse::Ack { success } => assert!(success),
            other => panic!("unexpected response: {other:?}"),
        }

        match harness.browser_rx.recv().await.unwrap() {
            BrowserCommand::CloseTab(tab) => assert_eq!(tab, TabId(7)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

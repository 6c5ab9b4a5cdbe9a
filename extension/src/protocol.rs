//! Messages between content pages, the background context and the browser.
//!
//! Requests and notices carry serde `action` tags matching the extension's
//! JSON messaging; the envelope types around them hold reply channels and
//! never cross a wire.

use phish_common::{NavigationEvent, Severity, TabId};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::CheckUrlReply;
use crate::queue::QueuedReport;

/// Page details captured when the user reports the current page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapture {
    /// Page URL.
    pub url: String,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Truncated page markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snippet: Option<String>,
    /// Reporter-chosen category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Reporter notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reporter-chosen severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl PageCapture {
    /// Minimal capture for a URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            html_snippet: None,
            category: None,
            description: None,
            severity: None,
        }
    }
}

/// Requests a content page or the popup sends to the background context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackgroundRequest {
    /// Close the calling tab.
    CloseTab,
    /// Submit the current page as a phishing report.
    ReportPhishing {
        /// Captured page details.
        data: PageCapture,
    },
    /// List the locally queued reports.
    GetLocalReports,
    /// Push queued reports to the backend.
    SyncReports,
    /// Ask the backend for a URL verdict.
    CheckUrl {
        /// URL to evaluate.
        url: String,
    },
}

/// Notices the background pushes to a content page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContentNotice {
    /// Run the scripted warning walkthrough.
    StartSimulation,
    /// The tab just completed a suspicious redirect chain.
    TriggerRedirectWarning {
        /// Visited URLs in navigation order.
        chain: Vec<String>,
    },
}

/// Replies from the background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundResponse {
    /// Plain acknowledgement.
    Ack {
        /// Whether the request took effect.
        success: bool,
    },
    /// Backend verdict for a `check_url` request.
    Verdict(CheckUrlReply),
    /// Outcome of a `report_phishing` request.
    ReportOutcome {
        /// The report was captured (queued at minimum).
        success: bool,
        /// The report also reached the backend.
        synced: bool,
        /// Queue record id.
        id: Uuid,
    },
    /// Queued reports, newest last.
    LocalReports {
        /// Queue contents.
        reports: Vec<QueuedReport>,
    },
    /// Outcome of a `sync_reports` pass.
    SyncOutcome {
        /// Reports that reached the backend this pass.
        synced: usize,
        /// Unsynced reports found before the pass.
        total: usize,
    },
    /// The request failed; the caller decides how to degrade.
    Error {
        /// What went wrong.
        message: String,
    },
}

/// A request paired with its originating tab and reply channel.
#[derive(Debug)]
pub struct RequestEnvelope {
    /// Tab the request came from.
    pub tab: TabId,
    /// The request itself.
    pub request: BackgroundRequest,
    /// Where the response goes. Dropped receivers are fine; replies to
    /// fire-and-forget senders just vanish.
    pub reply: oneshot::Sender<BackgroundResponse>,
}

/// Browser-originated events feeding the background loop.
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// A navigation committed.
    Navigation(NavigationEvent),
    /// A tab was closed.
    TabRemoved(TabId),
}

/// Commands the background issues back to the browser shell.
#[derive(Debug)]
pub enum BrowserCommand {
    /// Close a tab.
    CloseTab(TabId),
    /// Capture a screenshot of the tab; `None` when capture is unavailable.
    CaptureVisibleTab {
        /// Tab to capture.
        tab: TabId,
        /// Receives the screenshot data URL.
        reply: oneshot::Sender<Option<String>>,
    },
}

/// A notice addressed to one tab's content page.
#[derive(Debug, Clone)]
pub struct TabNotice {
    /// Destination tab.
    pub tab: TabId,
    /// The notice.
    pub notice: ContentNotice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_action_tags() {
        let json = serde_json::to_value(BackgroundRequest::CloseTab).unwrap();
        assert_eq!(json["action"], "close_tab");

        let json = serde_json::to_value(BackgroundRequest::CheckUrl {
            url: "https://x.example".into(),
        })
        .unwrap();
        assert_eq!(json["action"], "check_url");
        assert_eq!(json["url"], "https://x.example");

        let json = serde_json::to_value(BackgroundRequest::ReportPhishing {
            data: PageCapture::for_url("https://scam.example"),
        })
        .unwrap();
        assert_eq!(json["action"], "report_phishing");
        assert_eq!(json["data"]["url"], "https://scam.example");
    }

    #[test]
    fn test_request_roundtrip() {
        let raw = r#"{"action":"sync_reports"}"#;
        let parsed: BackgroundRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed, BackgroundRequest::SyncReports);
    }

    #[test]
    fn test_notice_action_tags() {
        let json = serde_json::to_value(ContentNotice::TriggerRedirectWarning {
            chain: vec!["https://a.example".into(), "https://b.example".into()],
        })
        .unwrap();
        assert_eq!(json["action"], "trigger_redirect_warning");
        assert_eq!(json["chain"].as_array().unwrap().len(), 2);

        let json = serde_json::to_value(ContentNotice::StartSimulation).unwrap();
        assert_eq!(json["action"], "start_simulation");
    }

    #[test]
    fn test_capture_camel_case_wire() {
        let capture = PageCapture {
            html_snippet: Some("<html></html>".into()),
            ..PageCapture::for_url("https://scam.example")
        };
        let json = serde_json::to_value(&capture).unwrap();
        assert_eq!(json["htmlSnippet"], "<html></html>");
        assert!(json.get("title").is_none());
    }
}

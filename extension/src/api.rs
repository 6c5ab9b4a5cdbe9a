//! Backend REST client.
//!
//! The runtime talks to the backend through the [`BackendApi`] trait so the
//! loops can be exercised against a scripted stub. [`HttpBackend`] is the
//! real implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use phish_common::{PhishError, PhishResult, Severity};
use phish_guard::ShieldStatus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Deadline for one backend call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Verdict payload of `POST /api/check-url`.
///
/// The backend's tri-state `threat` field is ignored here; the boolean
/// markers carry the same information without a union type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckUrlReply {
    /// Overall decision.
    pub safe: bool,
    /// Present and `true` for blocking verdicts.
    pub is_phishing: Option<bool>,
    /// Present and `true` for warn-level verdicts.
    pub suspicious: Option<bool>,
    /// Threat taxonomy label.
    pub threat_type: Option<String>,
    /// Human-readable explanation.
    pub message: Option<String>,
    /// Present and `true` when the backend served its cache.
    pub cached: Option<bool>,
}

impl CheckUrlReply {
    /// Maps the verdict onto a shield status.
    pub fn shield_status(&self) -> ShieldStatus {
        if self.is_phishing.unwrap_or(false) {
            ShieldStatus::Phishing
        } else if self.suspicious.unwrap_or(false) || !self.safe {
            ShieldStatus::Suspicious
        } else {
            ShieldStatus::Safe
        }
    }
}

/// Body of `POST /api/report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    /// Reported page URL.
    pub url: String,
    /// Page title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Truncated page markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_snippet: Option<String>,
    /// Screenshot data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Reporting browser's user agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Report category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Reporter notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Severity grade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Backend surface the runtime depends on.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Verdict for a URL.
    async fn check_url(&self, url: &str) -> PhishResult<CheckUrlReply>;

    /// Submit a phishing report. `Ok(false)` means the backend answered
    /// but refused; transport failures are `Err`.
    async fn submit_report(&self, report: &ReportSubmission) -> PhishResult<bool>;

    /// Submit a suspicious redirect chain.
    async fn submit_redirect(&self, chain: &[String]) -> PhishResult<()>;
}

/// reqwest-backed client for the ZeroPhish backend.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(e: reqwest::Error) -> PhishError {
        if e.is_timeout() {
            PhishError::Timeout("backend request".into())
        } else {
            PhishError::Upstream(e.to_string())
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn check_url(&self, url: &str) -> PhishResult<CheckUrlReply> {
        debug!(%url, "backend url check");
        let response = self
            .client
            .post(self.endpoint("/api/check-url"))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(PhishError::Upstream(format!(
                "check-url returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| PhishError::Upstream(format!("check-url body: {e}")))
    }

    async fn submit_report(&self, report: &ReportSubmission) -> PhishResult<bool> {
        let response = self
            .client
            .post(self.endpoint("/api/report"))
            .json(report)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Ok(response.status().is_success())
    }

    async fn submit_redirect(&self, chain: &[String]) -> PhishResult<()> {
        let response = self
            .client
            .post(self.endpoint("/api/redirect"))
            .json(&serde_json::json!({ "chain": chain }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(PhishError::Upstream(format!(
                "redirect intake returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

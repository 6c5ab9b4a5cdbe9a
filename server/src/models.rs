//! Wire types for the HTTP API.
//!
//! Responses reproduce the contract the browser extension and dashboard
//! consume. The quirkiest part is the `threat` field of a URL check, which is
//! `false` for clean URLs, `"medium"` for warnings and `true` for blocks; the
//! [`ThreatField`] serializer keeps that union stable.

use chrono::{DateTime, Utc};
use phish_common::{RedirectRecord, Report, RiskVerdict, Severity, ThreatLevel, VerdictSource};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body of `POST /api/check-url`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckUrlRequest {
    /// URL to evaluate. An absent field is treated as blank and rejected
    /// with 400 rather than a deserialization error.
    #[serde(default)]
    pub url: String,
}

/// Tri-state threat marker: `false`, `"medium"` or `true` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatField {
    /// No threat.
    None,
    /// Warn-level signal.
    Medium,
    /// Block-level signal.
    High,
}

impl Serialize for ThreatField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ThreatField::None => serializer.serialize_bool(false),
            ThreatField::Medium => serializer.serialize_str("medium"),
            ThreatField::High => serializer.serialize_bool(true),
        }
    }
}

impl From<ThreatLevel> for ThreatField {
    fn from(level: ThreatLevel) -> Self {
        match level {
            ThreatLevel::None => ThreatField::None,
            ThreatLevel::Suspicious => ThreatField::Medium,
            ThreatLevel::Phishing => ThreatField::High,
        }
    }
}

/// Response of `POST /api/check-url`.
///
/// Optional markers are omitted rather than sent as `null` so that existing
/// truthiness checks in clients keep working.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckUrlResponse {
    /// Overall decision.
    pub safe: bool,
    /// Tri-state threat marker.
    #[schema(value_type = Object)]
    pub threat: ThreatField,
    /// Present and `true` only for blocking verdicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_phishing: Option<bool>,
    /// Present and `true` only for warn-level verdicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious: Option<bool>,
    /// Threat taxonomy label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_type: Option<String>,
    /// Targeted platform, when the intelligence service reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
    /// Human-readable explanation.
    pub message: String,
    /// Present and `true` when served from the verdict cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Present and `true` when local pattern tables decided alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heuristic: Option<bool>,
}

impl CheckUrlResponse {
    /// Maps a pipeline verdict onto the wire shape.
    pub fn from_verdict(verdict: &RiskVerdict) -> Self {
        Self {
            safe: verdict.safe,
            threat: verdict.level.into(),
            is_phishing: verdict.is_phishing().then_some(true),
            suspicious: (verdict.level == ThreatLevel::Suspicious).then_some(true),
            threat_type: verdict.threat_type.clone(),
            platform_type: verdict.platform_type.clone(),
            message: verdict.message.clone(),
            cached: (verdict.source == VerdictSource::Cached).then_some(true),
            heuristic: (verdict.source == VerdictSource::Heuristic).then_some(true),
        }
    }
}

/// Body of `POST /api/report`.
///
/// The request side of the contract is camelCase; stored records use
/// snake_case column names.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Reported page URL.
    #[serde(default)]
    pub url: String,
    /// Page title at capture time.
    #[serde(default)]
    pub title: Option<String>,
    /// Report category; defaults to `General`.
    #[serde(default)]
    pub category: Option<String>,
    /// Free-form reporter notes.
    #[serde(default)]
    pub description: Option<String>,
    /// Severity grade; defaults to `Medium`.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub severity: Option<Severity>,
    /// Capture time; server intake time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Reporting browser's user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Screenshot data URL.
    #[serde(default)]
    pub screenshot: Option<String>,
    /// Truncated page markup.
    #[serde(default)]
    pub html_snippet: Option<String>,
}

impl ReportRequest {
    /// Builds the stored record, filling defaults for absent fields.
    pub fn into_report(self) -> Report {
        let mut report = Report::new(self.url.trim());
        report.title = self.title;
        report.html_snippet = self.html_snippet;
        report.screenshot = self.screenshot;
        report.user_agent = self.user_agent;
        report.description = self.description;
        if let Some(timestamp) = self.timestamp {
            report.timestamp = timestamp;
        }
        if let Some(category) = self.category {
            report.category = category;
        }
        if let Some(severity) = self.severity {
            report.severity = severity;
        }
        report
    }
}

/// Response of a successful `POST /api/report`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportAccepted {
    /// Always `true`.
    pub success: bool,
    /// Storage tier the intake runs on.
    pub storage: String,
    /// Confirmation text.
    pub message: String,
    /// Id assigned to the record.
    pub id: Uuid,
    /// Intake time.
    pub timestamp: DateTime<Utc>,
    /// The stored record, echoed back for dashboard updates.
    #[schema(value_type = Object)]
    pub report: Report,
}

/// Body of `POST /api/redirect`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RedirectRequest {
    /// Visited URLs in navigation order.
    #[serde(default)]
    pub chain: Vec<String>,
}

/// Response of a successful `POST /api/redirect`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAccepted {
    /// Always `true`.
    pub success: bool,
    /// Id assigned to the record.
    pub id: Uuid,
    /// Number of URLs in the chain.
    pub chain_length: usize,
}

/// Response of `GET /api/reports`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportList {
    /// Newest-first reports.
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<Report>,
    /// Number of reports returned.
    pub count: usize,
}

/// Response of `GET /api/redirects`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectList {
    /// Newest-first redirect records.
    #[schema(value_type = Vec<Object>)]
    pub redirects: Vec<RedirectRecord>,
    /// Number of records returned.
    pub count: usize,
}

/// One entry of the merged activity feed.
///
/// Flattens the record and tags it with `"type": "Report" | "Redirect"`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LogEntry {
    /// A phishing report.
    Report(Report),
    /// A redirect chain record.
    Redirect(RedirectRecord),
}

impl LogEntry {
    /// Event time, used for merge ordering.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Report(r) => r.timestamp,
            LogEntry::Redirect(r) => r.timestamp,
        }
    }
}

/// Response of `GET /api/logs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogList {
    /// Newest-first merged feed, truncated to `limit`.
    #[schema(value_type = Vec<Object>)]
    pub logs: Vec<LogEntry>,
    /// Total number of events before truncation.
    pub count: usize,
    /// Applied limit.
    pub limit: usize,
}

/// Coarse risk grade derived from intake volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum RiskLabel {
    /// More than ten recorded incidents.
    High,
    /// Six to ten recorded incidents.
    Moderate,
    /// Five or fewer recorded incidents.
    Low,
}

impl RiskLabel {
    /// Grades the combined incident count.
    pub fn from_total(total: u64) -> Self {
        if total > 10 {
            RiskLabel::High
        } else if total > 5 {
            RiskLabel::Moderate
        } else {
            RiskLabel::Low
        }
    }
}

/// Response of `GET /api/stats`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Number of phishing reports.
    pub reports: u64,
    /// Number of redirect chain records.
    pub redirects: u64,
    /// Combined incident count.
    pub total: u64,
    /// Coarse risk grade.
    pub risk: RiskLabel,
    /// Response generation time.
    pub last_updated: DateTime<Utc>,
}

/// Response of `GET /api/health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` for 200 responses.
    pub status: String,
    /// Storage tier the intake runs on.
    pub storage: String,
    /// Primary store reachability, when a primary is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_status: Option<String>,
    /// Number of phishing reports.
    pub reports: u64,
    /// Number of redirect chain records.
    pub redirects: u64,
    /// Probe time.
    pub timestamp: DateTime<Utc>,
}

/// Response of `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    /// Always `online`.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Storage tier the intake runs on.
    pub storage: String,
    /// Route map for quick orientation.
    pub endpoints: EndpointMap,
}

/// Route map served by the service info endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMap {
    /// Aggregate counters.
    pub stats: String,
    /// Merged activity feed.
    pub logs: String,
    /// Report intake.
    pub report: String,
    /// Report listing.
    pub reports: String,
    /// Redirect chain intake.
    pub redirect: String,
    /// URL safety check.
    pub check_url: String,
    /// Liveness and storage probe.
    pub health: String,
    /// Interactive API documentation.
    pub docs: String,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self {
            stats: "/api/stats".into(),
            logs: "/api/logs".into(),
            report: "/api/report".into(),
            reports: "/api/reports".into(),
            redirect: "/api/redirect".into(),
            check_url: "/api/check-url".into(),
            health: "/api/health".into(),
            docs: "/docs".into(),
        }
    }
}

/// Plain error body used by `POST /api/check-url` and internal failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// What went wrong.
    pub error: String,
}

/// Error body of the intake endpoints, which carry a `success` flag.
#[derive(Debug, Serialize, ToSchema)]
pub struct RejectBody {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: String,
}

impl RejectBody {
    /// Builds a rejection with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body of the 404 fallback.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotFoundBody {
    /// Always `Endpoint not found`.
    pub error: String,
    /// Requested path.
    pub path: String,
    /// Requested method.
    pub method: String,
}

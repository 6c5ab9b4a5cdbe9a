//! Phishing reports and redirect records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report severity grades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Severity {
    /// Informational
    Low,
    /// Default grade for user submissions
    #[default]
    Medium,
    /// Confirmed malicious content
    High,
    /// Active campaign
    Critical,
}

/// A user- or pipeline-submitted phishing report
///
/// Append-only: records are never updated after intake except for the
/// `synced` flag, which flips once the record reaches the primary store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Record id
    pub id: Uuid,
    /// Reported page URL
    pub url: String,
    /// Page title at capture time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Truncated page markup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snippet: Option<String>,
    /// Screenshot data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Reporting browser's user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Report category
    pub category: String,
    /// Free-form reporter notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Severity grade
    pub severity: Severity,
    /// Whether the record has reached the primary store
    #[serde(default)]
    pub synced: bool,
}

impl Report {
    /// Default category for submissions that carry none
    pub const DEFAULT_CATEGORY: &'static str = "General";

    /// Create a minimal report for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: None,
            html_snippet: None,
            screenshot: None,
            user_agent: None,
            timestamp: Utc::now(),
            category: Self::DEFAULT_CATEGORY.into(),
            description: None,
            severity: Severity::default(),
            synced: false,
        }
    }
}

/// A recorded suspicious redirect chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectRecord {
    /// Record id
    pub id: Uuid,
    /// Visited URLs in navigation order
    pub chain: Vec<String>,
    /// Detection time
    pub timestamp: DateTime<Utc>,
    /// Whether the record has reached the primary store
    #[serde(default)]
    pub synced: bool,
}

impl RedirectRecord {
    /// Create a record for the given chain
    pub fn new(chain: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chain,
            timestamp: Utc::now(),
            synced: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_get_distinct_ids() {
        let a = Report::new("https://example.org");
        let b = Report::new("https://example.org");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_report_defaults() {
        let report = Report::new("https://example.org");
        assert_eq!(report.category, "General");
        assert_eq!(report.severity, Severity::Medium);
        assert!(!report.synced);
    }

    #[test]
    fn test_severity_wire_names() {
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"Medium\"");
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"High\"");
    }
}

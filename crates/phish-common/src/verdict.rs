//! URL risk verdicts

use serde::{Deserialize, Serialize};

/// Threat severity established for a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    /// No threat found
    None,
    /// Medium-confidence signal, warn but do not block
    Suspicious,
    /// High-confidence signal, block
    Phishing,
}

/// Which stage of the pipeline produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Local pattern tables
    Heuristic,
    /// Threat intelligence API
    External,
    /// Served from the risk cache
    Cached,
}

/// Outcome of a URL safety check
///
/// Immutable once produced. `level == Phishing` implies `safe == false`;
/// the constructors maintain that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Overall safety decision
    pub safe: bool,
    /// Severity of the finding
    pub level: ThreatLevel,
    /// Threat taxonomy label (e.g. "PHISHING", "SOCIAL_ENGINEERING")
    pub threat_type: Option<String>,
    /// Platform the threat targets, when the external service reports one
    pub platform_type: Option<String>,
    /// Human-readable explanation
    pub message: String,
    /// Stage that produced this verdict
    pub source: VerdictSource,
}

impl RiskVerdict {
    /// Safe verdict from the given stage
    pub fn safe(message: impl Into<String>, source: VerdictSource) -> Self {
        Self {
            safe: true,
            level: ThreatLevel::None,
            threat_type: None,
            platform_type: None,
            message: message.into(),
            source,
        }
    }

    /// Blocking verdict
    pub fn phishing(threat_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            safe: false,
            level: ThreatLevel::Phishing,
            threat_type: Some(threat_type.into()),
            platform_type: None,
            message: message.into(),
            source: VerdictSource::Heuristic,
        }
    }

    /// Warning verdict
    pub fn suspicious(message: impl Into<String>) -> Self {
        Self {
            safe: false,
            level: ThreatLevel::Suspicious,
            threat_type: Some("SUSPICIOUS".into()),
            platform_type: None,
            message: message.into(),
            source: VerdictSource::Heuristic,
        }
    }

    /// True for blocking verdicts
    pub fn is_phishing(&self) -> bool {
        self.level == ThreatLevel::Phishing
    }

    /// Re-issue this verdict as a cache hit
    pub fn into_cached(mut self) -> Self {
        self.source = VerdictSource::Cached;
        self
    }
}

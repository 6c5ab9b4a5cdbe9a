//! External threat lookup
//!
//! Single-shot POST against a Safe Browsing v4 compatible endpoint. The
//! service is an unreliable collaborator: callers treat every error here
//! as a signal to fall back to the heuristic verdict, never as fatal.

use phish_common::{RiskVerdict, ThreatLevel, VerdictSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default lookup endpoint
pub const DEFAULT_ENDPOINT: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";

/// Deadline for one lookup
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CLIENT_ID: &str = "zerophish";

/// External lookup failure
#[derive(Debug, Error)]
pub enum IntelError {
    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Response body did not parse
    #[error("parse error: {0}")]
    Parse(String),
    /// Deadline exceeded
    #[error("lookup timed out")]
    Timeout,
}

/// Threat lookup service configuration
#[derive(Debug, Clone)]
pub struct SafeBrowsingConfig {
    /// Lookup endpoint
    pub endpoint: String,
    /// API key appended as a query parameter
    pub api_key: String,
    /// Per-request deadline
    pub timeout: Duration,
}

impl SafeBrowsingConfig {
    /// Config for the default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: api_key.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Threat lookup client
pub struct SafeBrowsingClient {
    config: SafeBrowsingConfig,
    client: reqwest::Client,
}

impl SafeBrowsingClient {
    /// Build a client for the given config
    pub fn new(config: SafeBrowsingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap();

        Self { config, client }
    }

    /// Look up one URL
    pub async fn check(&self, url: &str) -> Result<RiskVerdict, IntelError> {
        debug!(%url, "external threat lookup");

        let body = LookupRequest {
            client: ClientInfo {
                client_id: CLIENT_ID,
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ThreatInfo {
                threat_types: vec![
                    "MALWARE",
                    "SOCIAL_ENGINEERING",
                    "UNWANTED_SOFTWARE",
                    "POTENTIALLY_HARMFUL_APPLICATION",
                ],
                platform_types: vec!["ANY_PLATFORM"],
                threat_entry_types: vec!["URL"],
                threat_entries: vec![ThreatEntry { url: url.to_string() }],
            },
        };

        let endpoint = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IntelError::Timeout
                } else {
                    IntelError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(IntelError::Http(response.status().as_u16()));
        }

        let result: LookupResponse = response
            .json()
            .await
            .map_err(|e| IntelError::Parse(e.to_string()))?;

        match result.matches.into_iter().next() {
            Some(found) => {
                info!(%url, threat_type = %found.threat_type, "threat match");
                Ok(RiskVerdict {
                    safe: false,
                    level: ThreatLevel::Phishing,
                    message: format!(
                        "This URL has been flagged as {}",
                        humanize(&found.threat_type)
                    ),
                    threat_type: Some(found.threat_type),
                    platform_type: found.platform_type,
                    source: VerdictSource::External,
                })
            }
            None => Ok(RiskVerdict::safe(
                "No threats detected",
                VerdictSource::External,
            )),
        }
    }
}

/// Taxonomy label to display form: "SOCIAL_ENGINEERING" -> "social engineering"
fn humanize(threat_type: &str) -> String {
    threat_type.replace('_', " ").to_lowercase()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest {
    client: ClientInfo,
    threat_info: ThreatInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo {
    client_id: &'static str,
    client_version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo {
    threat_types: Vec<&'static str>,
    platform_types: Vec<&'static str>,
    threat_entry_types: Vec<&'static str>,
    threat_entries: Vec<ThreatEntry>,
}

#[derive(Serialize)]
struct ThreatEntry {
    url: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    threat_type: String,
    #[serde(default)]
    platform_type: Option<String>,
}

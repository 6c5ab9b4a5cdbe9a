//! Hosted REST store
//!
//! Talks PostgREST conventions: rows under `/rest/v1/<table>`, the API
//! key in both `apikey` and `Authorization` headers, counting via
//! `Prefer: count=exact` and the `Content-Range` response header.

use crate::{IntakeCounts, IntakeStore};
use async_trait::async_trait;
use phish_common::{PhishError, PhishResult, RedirectRecord, Report};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const REPORTS_TABLE: &str = "phishing_reports";
const REDIRECTS_TABLE: &str = "redirect_chains";

/// Deadline for one store call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hosted store connection settings
#[derive(Debug, Clone)]
pub struct HostedStoreConfig {
    /// Service base URL
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Per-request deadline
    pub timeout: Duration,
}

impl HostedStoreConfig {
    /// Settings with the default deadline
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// REST intake store
pub struct HostedStore {
    config: HostedStoreConfig,
    client: reqwest::Client,
}

impl HostedStore {
    /// Build a store for the given settings
    pub fn new(config: HostedStoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap();

        Self { config, client }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            table
        )
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    async fn insert<T: Serialize>(&self, table: &str, row: &T) -> PhishResult<()> {
        let response = self
            .authed(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await
            .map_err(to_store_error)?;

        expect_success(response).await?;
        debug!(table, "row inserted");
        Ok(())
    }

    async fn list<T: DeserializeOwned>(&self, table: &str, limit: usize) -> PhishResult<Vec<T>> {
        let url = format!(
            "{}?select=*&order=timestamp.desc&limit={}",
            self.table_url(table),
            limit
        );
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .map_err(to_store_error)?;

        expect_success(response)
            .await?
            .json()
            .await
            .map_err(|e| PhishError::Upstream(format!("{table}: {e}")))
    }

    async fn count(&self, table: &str) -> PhishResult<u64> {
        let response = self
            .authed(self.client.get(self.table_url(table)))
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await
            .map_err(to_store_error)?;

        let response = expect_success(response).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PhishError::Upstream(format!("{table}: no content-range")))?;

        // "0-0/57" or "*/0"
        range
            .rsplit('/')
            .next()
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| PhishError::Upstream(format!("{table}: bad content-range {range}")))
    }
}

#[async_trait]
impl IntakeStore for HostedStore {
    async fn insert_report(&self, report: &Report) -> PhishResult<()> {
        self.insert(REPORTS_TABLE, report).await
    }

    async fn insert_redirect(&self, record: &RedirectRecord) -> PhishResult<()> {
        self.insert(REDIRECTS_TABLE, record).await
    }

    async fn reports(&self, limit: usize) -> PhishResult<Vec<Report>> {
        self.list(REPORTS_TABLE, limit).await
    }

    async fn redirects(&self, limit: usize) -> PhishResult<Vec<RedirectRecord>> {
        self.list(REDIRECTS_TABLE, limit).await
    }

    async fn counts(&self) -> PhishResult<IntakeCounts> {
        Ok(IntakeCounts {
            reports: self.count(REPORTS_TABLE).await?,
            redirects: self.count(REDIRECTS_TABLE).await?,
        })
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

fn to_store_error(e: reqwest::Error) -> PhishError {
    if e.is_timeout() {
        PhishError::Timeout("hosted store".into())
    } else {
        PhishError::Upstream(e.to_string())
    }
}

async fn expect_success(response: reqwest::Response) -> PhishResult<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(PhishError::Upstream(format!(
            "hosted store returned {}",
            response.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_store() -> HostedStore {
        // Nothing listens on the discard port; calls fail fast.
        let mut config = HostedStoreConfig::new("http://127.0.0.1:9", "test-key");
        config.timeout = Duration::from_millis(200);
        HostedStore::new(config)
    }

    #[test]
    fn test_table_urls() {
        let store = HostedStore::new(HostedStoreConfig::new("https://db.example/", "k"));
        assert_eq!(
            store.table_url("phishing_reports"),
            "https://db.example/rest/v1/phishing_reports"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_upstream_error() {
        let store = unreachable_store();
        let err = store.reports(5).await.unwrap_err();
        assert!(err.is_degradation(), "got: {err}");
    }
}

//! Server configuration.
//!
//! Configuration is resolved in two steps: an optional JSON file (pointed at
//! by `ZEROPHISH_CONFIG`) establishes the base, then individual `ZEROPHISH_*`
//! environment variables override single fields. Every field has a default
//! that works for local development, so the server starts with no
//! configuration at all.

use std::path::Path;

use phish_common::{PhishError, PhishResult};
use phish_intel::SafeBrowsingConfig;
use phish_store::HostedStoreConfig;
use serde::{Deserialize, Serialize};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default path of the local JSON database.
pub const DEFAULT_DB_FILE: &str = "db.json";
/// Default verdict cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// Default interval between replays of unsynced local records.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Runtime configuration for the backend server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Path of the local JSON database file.
    pub db_file: String,
    /// Verdict cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Seconds between background sync passes of unsynced records.
    pub sync_interval_secs: u64,
    /// Base URL of the hosted store. Unset or placeholder means local-only.
    pub store_url: Option<String>,
    /// API key of the hosted store.
    pub store_key: Option<String>,
    /// Safe Browsing API key. Unset means heuristic-only checks.
    pub safe_browsing_key: Option<String>,
    /// Safe Browsing endpoint override, used by tests and self-hosted mirrors.
    pub safe_browsing_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_file: DEFAULT_DB_FILE.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            store_url: None,
            store_key: None,
            safe_browsing_key: None,
            safe_browsing_url: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> PhishResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw)
            .map_err(|e| PhishError::Validation(format!("invalid config file: {e}")))
    }

    /// Writes the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> PhishResult<()> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| PhishError::Internal(format!("serialize config: {e}")))?;
        std::fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    /// Builds configuration from the environment, starting from the config
    /// file named by `ZEROPHISH_CONFIG` when present.
    pub fn from_env() -> PhishResult<Self> {
        let mut config = match std::env::var("ZEROPHISH_CONFIG") {
            Ok(path) if !path.is_empty() => Self::load(path)?,
            _ => Self::default(),
        };

        if let Ok(port) = std::env::var("ZEROPHISH_PORT") {
            config.port = port
                .parse()
                .map_err(|_| PhishError::Validation(format!("invalid port: {port}")))?;
        }
        if let Ok(db_file) = std::env::var("ZEROPHISH_DB_FILE") {
            config.db_file = db_file;
        }
        if let Ok(url) = std::env::var("ZEROPHISH_STORE_URL") {
            config.store_url = Some(url);
        }
        if let Ok(key) = std::env::var("ZEROPHISH_STORE_KEY") {
            config.store_key = Some(key);
        }
        if let Ok(key) = std::env::var("ZEROPHISH_SAFE_BROWSING_KEY") {
            config.safe_browsing_key = Some(key);
        }
        if let Ok(url) = std::env::var("ZEROPHISH_SAFE_BROWSING_URL") {
            config.safe_browsing_url = Some(url);
        }
        Ok(config)
    }

    /// Hosted store configuration, when both URL and key are usable.
    ///
    /// Empty values and obvious placeholders are treated as unconfigured so
    /// that a templated deployment file does not point writes at a dead host.
    pub fn hosted_store(&self) -> Option<HostedStoreConfig> {
        let url = self.store_url.as_deref()?.trim();
        let key = self.store_key.as_deref()?.trim();
        if url.is_empty() || key.is_empty() || url.contains("placeholder") {
            return None;
        }
        Some(HostedStoreConfig::new(url, key))
    }

    /// Safe Browsing configuration, when an API key is set.
    pub fn safe_browsing(&self) -> Option<SafeBrowsingConfig> {
        let key = self.safe_browsing_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        let mut config = SafeBrowsingConfig::new(key);
        if let Some(url) = &self.safe_browsing_url {
            config.endpoint = url.clone();
        }
        Some(config)
    }
}

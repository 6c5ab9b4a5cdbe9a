//! Extension runtime configuration.

use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Runtime configuration for both contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Backend base URL.
    pub backend_url: String,
    /// Warning countdown length in seconds.
    pub countdown_start_secs: f64,
    /// Delay before the automatic page scan, in milliseconds.
    pub scan_delay_ms: u64,
    /// Pending report queue capacity.
    pub queue_capacity: usize,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            countdown_start_secs: phish_guard::DEFAULT_START_SECS,
            scan_delay_ms: 1000,
            queue_capacity: 50,
        }
    }
}

impl ExtensionConfig {
    /// Defaults with the backend URL taken from `ZEROPHISH_BACKEND_URL`
    /// when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ZEROPHISH_BACKEND_URL") {
            if !url.is_empty() {
                config.backend_url = url;
            }
        }
        config
    }
}

//! ZeroPhish Intel - URL risk assessment pipeline
//!
//! # Pipeline
//!
//! ```text
//! check(url)
//!    │
//!    ├─► RiskCache ──────────── hit ──► verdict (source: cached)
//!    │
//!    ├─► HeuristicEngine ── threat ──► verdict cached + returned
//!    │
//!    └─► SafeBrowsingClient ── match ► phishing verdict, cached
//!                           └─ error ► heuristic-safe verdict, cached
//! ```
//!
//! Classification never fails: the external stage is optional and every
//! one of its errors degrades to the deterministic heuristic verdict.

#![warn(missing_docs)]

pub mod cache;
pub mod classifier;
pub mod safebrowsing;

pub use cache::{CacheStats, RiskCache, DEFAULT_TTL};
pub use classifier::HeuristicEngine;
pub use safebrowsing::{IntelError, SafeBrowsingClient, SafeBrowsingConfig};

use phish_common::RiskVerdict;
use tracing::warn;

/// Combined URL safety checker
///
/// Owns the full pipeline: cache, then heuristics, then the optional
/// external lookup.
pub struct UrlChecker {
    engine: HeuristicEngine,
    cache: RiskCache,
    external: Option<SafeBrowsingClient>,
}

impl UrlChecker {
    /// Build a checker; `external` is None when no API key is configured
    pub fn new(cache: RiskCache, external: Option<SafeBrowsingClient>) -> Self {
        Self {
            engine: HeuristicEngine::new(),
            cache,
            external,
        }
    }

    /// Resolve a verdict for the URL
    pub async fn check(&self, url: &str) -> RiskVerdict {
        if let Some(hit) = self.cache.lookup(url) {
            return hit;
        }

        let verdict = self.engine.classify(url);
        if !verdict.safe {
            self.cache.store(url, verdict.clone());
            return verdict;
        }

        // Heuristics found nothing. Without an external service the
        // deterministic verdict stands and is not worth caching.
        let client = match &self.external {
            Some(client) => client,
            None => return verdict,
        };

        let resolved = match client.check(url).await {
            Ok(external) => external,
            Err(e) => {
                warn!(%url, error = %e, "external lookup failed, keeping heuristic verdict");
                verdict
            }
        };

        self.cache.store(url, resolved.clone());
        resolved
    }

    /// Heuristic stage only, bypassing cache and external lookup
    pub fn classify(&self, url: &str) -> RiskVerdict {
        self.engine.classify(url)
    }

    /// Verdict cache handle
    pub fn cache(&self) -> &RiskCache {
        &self.cache
    }
}

//! ZeroPhish Store - intake persistence
//!
//! One [`IntakeStore`] contract, three implementations:
//! - [`HostedStore`]: REST rows in a hosted PostgREST-compatible backend
//! - [`FileStore`]: a local whole-document JSON file
//! - [`FallbackStore`]: hosted-first with transparent local fallback and
//!   replay of records that missed the primary

#![warn(missing_docs)]

pub mod fallback;
pub mod file;
pub mod hosted;

pub use fallback::{FallbackStore, SyncOutcome};
pub use file::FileStore;
pub use hosted::{HostedStore, HostedStoreConfig};

use async_trait::async_trait;
use phish_common::{PhishResult, RedirectRecord, Report};
use serde::Serialize;

/// Record counts across both intake kinds
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IntakeCounts {
    /// Stored phishing reports
    pub reports: u64,
    /// Stored redirect chains
    pub redirects: u64,
}

impl IntakeCounts {
    /// Combined record count
    pub fn total(&self) -> u64 {
        self.reports + self.redirects
    }
}

/// Persistence contract for intake records
///
/// Intake is append-only: stores never update or delete records, and the
/// same payload submitted twice yields two records with distinct ids.
#[async_trait]
pub trait IntakeStore: Send + Sync {
    /// Persist a phishing report
    async fn insert_report(&self, report: &Report) -> PhishResult<()>;

    /// Persist a redirect record
    async fn insert_redirect(&self, record: &RedirectRecord) -> PhishResult<()>;

    /// Most recent reports, newest first
    async fn reports(&self, limit: usize) -> PhishResult<Vec<Report>>;

    /// Most recent redirect records, newest first
    async fn redirects(&self, limit: usize) -> PhishResult<Vec<RedirectRecord>>;

    /// Record counts
    async fn counts(&self) -> PhishResult<IntakeCounts>;

    /// Short backend label for health reporting
    fn name(&self) -> &'static str;
}

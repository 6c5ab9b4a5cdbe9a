//! Primary/secondary store fallback

use crate::{FileStore, HostedStore, IntakeCounts, IntakeStore};
use async_trait::async_trait;
use phish_common::{PhishResult, RedirectRecord, Report};
use tracing::{info, warn};

/// Result of one replay pass over unsynced records
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    /// Unsynced records found before the pass
    pub pending: usize,
    /// Records that reached the primary this pass
    pub synced: usize,
    /// Whether the pass stopped early on a failure
    pub stopped: bool,
}

/// Hosted-first store with local fallback
///
/// Writes go to the primary; on failure (or with no primary configured)
/// they land in the local file marked unsynced. Reads prefer the primary
/// and degrade transparently. [`FallbackStore::sync_unsynced`] replays
/// fallback records in order and stops at the first failure so a dead
/// upstream is probed once per pass, not once per record.
pub struct FallbackStore {
    primary: Option<HostedStore>,
    secondary: FileStore,
}

impl FallbackStore {
    /// Compose a fallback store
    pub fn new(primary: Option<HostedStore>, secondary: FileStore) -> Self {
        Self { primary, secondary }
    }

    /// Storage label for health and service info
    pub fn storage_label(&self) -> &'static str {
        match self.primary {
            Some(_) => "hosted",
            None => "local",
        }
    }

    /// Local store handle
    pub fn secondary(&self) -> &FileStore {
        &self.secondary
    }

    /// Probe the primary; None when no primary is configured
    pub async fn primary_status(&self) -> Option<&'static str> {
        let primary = self.primary.as_ref()?;
        match primary.counts().await {
            Ok(_) => Some("connected"),
            Err(_) => Some("disconnected"),
        }
    }

    /// Replay unsynced fallback records against the primary
    pub async fn sync_unsynced(&self) -> PhishResult<SyncOutcome> {
        let primary = match &self.primary {
            Some(primary) => primary,
            None => return Ok(SyncOutcome::default()),
        };

        let (reports, redirects) = self.secondary.unsynced().await?;
        let mut outcome = SyncOutcome {
            pending: reports.len() + redirects.len(),
            ..SyncOutcome::default()
        };

        for report in reports {
            let mut row = report.clone();
            row.synced = true;
            if let Err(e) = primary.insert_report(&row).await {
                warn!(error = %e, id = %report.id, "sync stopped at report");
                outcome.stopped = true;
                return Ok(outcome);
            }
            self.secondary.mark_report_synced(report.id).await?;
            outcome.synced += 1;
        }

        for record in redirects {
            let mut row = record.clone();
            row.synced = true;
            if let Err(e) = primary.insert_redirect(&row).await {
                warn!(error = %e, id = %record.id, "sync stopped at redirect");
                outcome.stopped = true;
                return Ok(outcome);
            }
            self.secondary.mark_redirect_synced(record.id).await?;
            outcome.synced += 1;
        }

        if outcome.synced > 0 {
            info!(synced = outcome.synced, "fallback records replayed");
        }
        Ok(outcome)
    }
}

#[async_trait]
impl IntakeStore for FallbackStore {
    async fn insert_report(&self, report: &Report) -> PhishResult<()> {
        if let Some(primary) = &self.primary {
            let mut row = report.clone();
            row.synced = true;
            match primary.insert_report(&row).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "primary write failed, falling back to local"),
            }
        }
        self.secondary.insert_report(report).await
    }

    async fn insert_redirect(&self, record: &RedirectRecord) -> PhishResult<()> {
        if let Some(primary) = &self.primary {
            let mut row = record.clone();
            row.synced = true;
            match primary.insert_redirect(&row).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "primary write failed, falling back to local"),
            }
        }
        self.secondary.insert_redirect(record).await
    }

    async fn reports(&self, limit: usize) -> PhishResult<Vec<Report>> {
        if let Some(primary) = &self.primary {
            match primary.reports(limit).await {
                Ok(reports) => return Ok(reports),
                Err(e) => warn!(error = %e, "primary read failed, serving local records"),
            }
        }
        self.secondary.reports(limit).await
    }

    async fn redirects(&self, limit: usize) -> PhishResult<Vec<RedirectRecord>> {
        if let Some(primary) = &self.primary {
            match primary.redirects(limit).await {
                Ok(redirects) => return Ok(redirects),
                Err(e) => warn!(error = %e, "primary read failed, serving local records"),
            }
        }
        self.secondary.redirects(limit).await
    }

    async fn counts(&self) -> PhishResult<IntakeCounts> {
        if let Some(primary) = &self.primary {
            match primary.counts().await {
                Ok(counts) => return Ok(counts),
                Err(e) => warn!(error = %e, "primary count failed, counting local records"),
            }
        }
        self.secondary.counts().await
    }

    fn name(&self) -> &'static str {
        self.storage_label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostedStoreConfig;
    use std::time::Duration;
    use tempfile::tempdir;

    fn local_only(dir: &tempfile::TempDir) -> FallbackStore {
        FallbackStore::new(None, FileStore::new(dir.path().join("db.json")))
    }

    fn dead_primary(dir: &tempfile::TempDir) -> FallbackStore {
        let mut config = HostedStoreConfig::new("http://127.0.0.1:9", "test-key");
        config.timeout = Duration::from_millis(200);
        FallbackStore::new(
            Some(HostedStore::new(config)),
            FileStore::new(dir.path().join("db.json")),
        )
    }

    #[tokio::test]
    async fn test_local_only_mode() {
        let dir = tempdir().unwrap();
        let store = local_only(&dir);

        assert_eq!(store.storage_label(), "local");
        assert!(store.primary_status().await.is_none());

        store.insert_report(&Report::new("https://x.example")).await.unwrap();
        let reports = store.reports(10).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].synced);

        // Nothing to sync against.
        let outcome = store.sync_unsynced().await.unwrap();
        assert_eq!(outcome.pending, 0);
        assert!(!outcome.stopped);
    }

    #[tokio::test]
    async fn test_failed_primary_write_lands_locally_unsynced() {
        let dir = tempdir().unwrap();
        let store = dead_primary(&dir);

        store.insert_report(&Report::new("https://x.example")).await.unwrap();
        store
            .insert_redirect(&RedirectRecord::new(vec![
                "https://a.example".into(),
                "https://b.example".into(),
            ]))
            .await
            .unwrap();

        let (reports, redirects) = store.secondary().unsynced().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(redirects.len(), 1);
    }

    #[tokio::test]
    async fn test_reads_degrade_to_local() {
        let dir = tempdir().unwrap();
        let store = dead_primary(&dir);

        store.insert_report(&Report::new("https://x.example")).await.unwrap();

        let reports = store.reports(10).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(store.counts().await.unwrap().reports, 1);
        assert_eq!(store.primary_status().await, Some("disconnected"));
    }

    #[tokio::test]
    async fn test_sync_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let store = dead_primary(&dir);

        store.insert_report(&Report::new("https://a.example")).await.unwrap();
        store.insert_report(&Report::new("https://b.example")).await.unwrap();

        let outcome = store.sync_unsynced().await.unwrap();
        assert_eq!(outcome.pending, 2);
        assert_eq!(outcome.synced, 0);
        assert!(outcome.stopped);

        // Both records still await replay.
        let (reports, _) = store.secondary().unsynced().await.unwrap();
        assert_eq!(reports.len(), 2);
    }
}

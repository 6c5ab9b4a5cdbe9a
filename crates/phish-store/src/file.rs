//! Local JSON document store

use crate::{IntakeCounts, IntakeStore};
use async_trait::async_trait;
use phish_common::{PhishError, PhishResult, RedirectRecord, Report};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Whole-document JSON database
#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    reports: Vec<Report>,
    #[serde(default)]
    redirects: Vec<RedirectRecord>,
}

/// File-backed intake store
///
/// The document is re-read on every operation and written back whole, so
/// external edits between requests are picked up. A store-level lock
/// serializes the read-modify-write cycles.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store over the given document path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Seed an empty document if none exists yet
    pub async fn init(&self) -> PhishResult<()> {
        let _guard = self.lock.lock().await;
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        self.write_db(&Database::default()).await?;
        info!(path = %self.path.display(), "seeded empty intake database");
        Ok(())
    }

    /// Document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_db(&self) -> PhishResult<Database> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| PhishError::Storage(format!("corrupt database: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Database::default()),
            Err(e) => Err(PhishError::Io(e)),
        }
    }

    async fn write_db(&self, db: &Database) -> PhishResult<()> {
        let content = serde_json::to_string_pretty(db)
            .map_err(|e| PhishError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Records that never reached the primary store, in append order
    pub async fn unsynced(&self) -> PhishResult<(Vec<Report>, Vec<RedirectRecord>)> {
        let _guard = self.lock.lock().await;
        let db = self.read_db().await?;
        let reports = db.reports.into_iter().filter(|r| !r.synced).collect();
        let redirects = db.redirects.into_iter().filter(|r| !r.synced).collect();
        Ok((reports, redirects))
    }

    /// Flip a report's synced flag
    pub async fn mark_report_synced(&self, id: Uuid) -> PhishResult<()> {
        let _guard = self.lock.lock().await;
        let mut db = self.read_db().await?;
        for report in db.reports.iter_mut().filter(|r| r.id == id) {
            report.synced = true;
        }
        self.write_db(&db).await
    }

    /// Flip a redirect record's synced flag
    pub async fn mark_redirect_synced(&self, id: Uuid) -> PhishResult<()> {
        let _guard = self.lock.lock().await;
        let mut db = self.read_db().await?;
        for record in db.redirects.iter_mut().filter(|r| r.id == id) {
            record.synced = true;
        }
        self.write_db(&db).await
    }
}

#[async_trait]
impl IntakeStore for FileStore {
    async fn insert_report(&self, report: &Report) -> PhishResult<()> {
        let _guard = self.lock.lock().await;
        let mut db = self.read_db().await?;
        db.reports.push(report.clone());
        self.write_db(&db).await
    }

    async fn insert_redirect(&self, record: &RedirectRecord) -> PhishResult<()> {
        let _guard = self.lock.lock().await;
        let mut db = self.read_db().await?;
        db.redirects.push(record.clone());
        self.write_db(&db).await
    }

    async fn reports(&self, limit: usize) -> PhishResult<Vec<Report>> {
        let _guard = self.lock.lock().await;
        let mut reports = self.read_db().await?.reports;
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        reports.truncate(limit);
        Ok(reports)
    }

    async fn redirects(&self, limit: usize) -> PhishResult<Vec<RedirectRecord>> {
        let _guard = self.lock.lock().await;
        let mut redirects = self.read_db().await?.redirects;
        redirects.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        redirects.truncate(limit);
        Ok(redirects)
    }

    async fn counts(&self) -> PhishResult<IntakeCounts> {
        let _guard = self.lock.lock().await;
        let db = self.read_db().await?;
        Ok(IntakeCounts {
            reports: db.reports.len() as u64,
            redirects: db.redirects.len() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

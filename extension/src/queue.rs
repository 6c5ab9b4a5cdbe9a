//! Local report queue.
//!
//! Reports are queued before submission so a dead backend never loses a
//! capture. The queue is bounded; once full, the oldest entry is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::api::ReportSubmission;
use crate::protocol::PageCapture;

/// Default queue bound.
pub const DEFAULT_CAPACITY: usize = 50;

/// A captured report waiting for (or already past) submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedReport {
    /// Local identity, independent of any backend-assigned id.
    pub id: Uuid,
    /// Page snapshot from the content side.
    pub capture: PageCapture,
    /// User agent recorded at capture time.
    pub user_agent: String,
    /// Screenshot data URL, when the capture succeeded.
    pub screenshot: Option<String>,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Whether the backend has accepted this report.
    pub synced: bool,
}

impl QueuedReport {
    /// New unsynced entry for a capture.
    pub fn new(capture: PageCapture, user_agent: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            capture,
            user_agent: user_agent.into(),
            screenshot: None,
            timestamp: Utc::now(),
            synced: false,
        }
    }

    /// Backend submission body for this entry.
    pub fn submission(&self) -> ReportSubmission {
        ReportSubmission {
            url: self.capture.url.clone(),
            title: self.capture.title.clone(),
            html_snippet: self.capture.html_snippet.clone(),
            screenshot: self.screenshot.clone(),
            user_agent: Some(self.user_agent.clone()),
            timestamp: self.timestamp,
            category: self.capture.category.clone(),
            description: self.capture.description.clone(),
            severity: self.capture.severity,
        }
    }
}

/// Bounded FIFO of queued reports.
#[derive(Debug)]
pub struct LocalQueue {
    entries: VecDeque<QueuedReport>,
    capacity: usize,
}

impl LocalQueue {
    /// Queue bounded at `capacity` (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest while over capacity.
    pub fn push(&mut self, report: QueuedReport) {
        self.entries.push_back(report);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Entries the backend has not accepted yet, oldest first.
    pub fn unsynced(&self) -> Vec<QueuedReport> {
        self.entries.iter().filter(|r| !r.synced).cloned().collect()
    }

    /// Marks an entry as accepted. Returns false if it was evicted.
    pub fn mark_synced(&mut self, id: Uuid) -> bool {
        match self.entries.iter_mut().find(|r| r.id == id) {
            Some(entry) => {
                entry.synced = true;
                true
            }
            None => false,
        }
    }

    /// Snapshot of every queued entry, oldest first.
    pub fn all(&self) -> Vec<QueuedReport> {
        self.entries.iter().cloned().collect()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LocalQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

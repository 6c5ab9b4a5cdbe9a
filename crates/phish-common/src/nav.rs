//! Browser navigation events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// How a navigation was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// User-initiated navigation (typed URL, link click, reload)
    Normal,
    /// HTTP 3xx redirect
    ServerRedirect,
    /// Script- or meta-refresh-driven redirect
    ClientRedirect,
}

impl Transition {
    /// True for both redirect kinds
    pub fn is_redirect(self) -> bool {
        matches!(self, Self::ServerRedirect | Self::ClientRedirect)
    }
}

/// A single observed navigation
///
/// Ephemeral input to the redirect chain tracker; never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationEvent {
    /// Tab the navigation happened in
    pub tab: TabId,
    /// Destination URL
    pub url: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Whether this is the top-level frame
    pub main_frame: bool,
    /// Navigation kind
    pub transition: Transition,
}

impl NavigationEvent {
    /// Main-frame navigation observed now
    pub fn main_frame(tab: TabId, url: impl Into<String>, transition: Transition) -> Self {
        Self {
            tab,
            url: url.into(),
            timestamp: Utc::now(),
            main_frame: true,
            transition,
        }
    }

    /// Subframe navigation observed now
    pub fn subframe(tab: TabId, url: impl Into<String>, transition: Transition) -> Self {
        Self {
            main_frame: false,
            ..Self::main_frame(tab, url, transition)
        }
    }
}

/// One hop of a per-tab redirect chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainHop {
    /// Visited URL
    pub url: String,
    /// Visit time
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a tab's redirect chain crosses the suspicion threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousChain {
    /// Tab that produced the chain
    pub tab: TabId,
    /// Full chain so far, in navigation order
    pub urls: Vec<String>,
    /// Detection time
    pub detected_at: DateTime<Utc>,
}

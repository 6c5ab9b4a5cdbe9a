//! ZeroPhish Guard - page protection state machines
//!
//! Two machines per page, driven by the content context:
//!
//! ```text
//! Shield:   Unknown ──► Safe | Suspicious | Phishing        (set once)
//!
//! Overlay:  Hidden ──► Warning(countdown) ──► Blocked
//!                └──────── trust / leave ◄────┘
//! ```
//!
//! The shield resolves exactly once per page; anything that arrives after
//! resolution (a slow external verdict, a duplicate scan) is discarded.
//! A transport failure on the verdict path resolves Safe: protection here
//! fails open, never locks the user out of a page it knows nothing about.

#![warn(missing_docs)]

pub mod countdown;

pub use countdown::{Countdown, DEFAULT_START_SECS, TICK, TICK_STEP};

use tracing::{debug, info, warn};

/// URL markers that resolve Phishing without a backend round-trip
pub const FAST_PATH_MARKERS: [&str; 4] = [
    "test-phishing",
    "suspicious",
    "?phish=true",
    "adventure-nicaragua.net",
];

/// Per-page threat status shown by the floating shield
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldStatus {
    /// Verdict not yet resolved
    Unknown,
    /// Page cleared
    Safe,
    /// Warn-level signal, banner shown
    Suspicious,
    /// Block-level signal, overlay shown
    Phishing,
}

/// Why the warning overlay appeared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningReason {
    /// The shield resolved Phishing
    PhishingDetected,
    /// A redirect chain of the given length was flagged for this tab
    RedirectChain(usize),
    /// Demo walkthrough requested
    Simulation,
}

/// Blocking overlay lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayState {
    /// No overlay
    Hidden,
    /// Grace-period overlay with a running countdown
    Warning {
        /// What triggered the overlay
        reason: WarningReason,
        /// Remaining grace time
        countdown: Countdown,
    },
    /// Hard block after the countdown ran out
    Blocked,
}

/// Shield summary surfaced when the user expands the shield
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShieldReport {
    /// Page host
    pub domain: String,
    /// Whether the page came over HTTPS
    pub encrypted: bool,
    /// Resolved status
    pub status: ShieldStatus,
}

/// Protection state for one page
pub struct PageGuard {
    url: String,
    countdown_start: f64,
    shield: ShieldStatus,
    overlay: OverlayState,
    trusted: bool,
    banner: bool,
}

impl PageGuard {
    /// Guard for a page with the default countdown
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_countdown(url, DEFAULT_START_SECS)
    }

    /// Guard with a custom countdown length
    pub fn with_countdown(url: impl Into<String>, countdown_start: f64) -> Self {
        Self {
            url: url.into(),
            countdown_start,
            shield: ShieldStatus::Unknown,
            overlay: OverlayState::Hidden,
            trusted: false,
            banner: false,
        }
    }

    /// Local marker scan; resolves Phishing on a hit without any backend
    /// round-trip. Returns whether the scan was decisive.
    pub fn fast_scan(&mut self) -> bool {
        let url = self.url.to_lowercase();
        if FAST_PATH_MARKERS.iter().any(|m| url.contains(m)) {
            info!(url = %self.url, "fast-path marker hit");
            self.resolve(ShieldStatus::Phishing);
            true
        } else {
            false
        }
    }

    /// Resolve the shield. First resolution wins; later calls are
    /// discarded, which is also how a late external verdict is dropped
    /// after the fallback path already resolved.
    pub fn resolve(&mut self, status: ShieldStatus) {
        if status == ShieldStatus::Unknown {
            return;
        }
        if self.shield != ShieldStatus::Unknown {
            debug!(?status, current = ?self.shield, "late verdict discarded");
            return;
        }

        self.shield = status;
        match status {
            ShieldStatus::Phishing => {
                warn!(url = %self.url, "page resolved as phishing");
                self.enter_warning(WarningReason::PhishingDetected);
            }
            ShieldStatus::Suspicious => {
                self.banner = true;
            }
            _ => {}
        }
    }

    /// Resolve Safe after a transport failure on the verdict path
    pub fn fail_open(&mut self) {
        debug!(url = %self.url, "verdict unavailable, failing open");
        self.resolve(ShieldStatus::Safe);
    }

    /// A suspicious redirect chain ending at this page
    pub fn redirect_warning(&mut self, hops: usize) {
        self.enter_warning(WarningReason::RedirectChain(hops));
    }

    /// Scripted demo trigger
    pub fn simulate(&mut self) {
        self.enter_warning(WarningReason::Simulation);
    }

    /// Advance the countdown one tick; true when this tick blocked the page
    pub fn tick(&mut self) -> bool {
        if let OverlayState::Warning { countdown, .. } = &mut self.overlay {
            if countdown.tick() {
                warn!(url = %self.url, "grace period over, page blocked");
                self.overlay = OverlayState::Blocked;
                return true;
            }
        }
        false
    }

    /// "I Trust This Site": dismiss the warning and suppress re-warnings
    /// for the rest of the session
    pub fn trust(&mut self) {
        if matches!(self.overlay, OverlayState::Warning { .. }) {
            info!(url = %self.url, "user trusted page");
            self.overlay = OverlayState::Hidden;
            self.trusted = true;
        }
    }

    /// "Leave Site": dismiss the warning; the driver closes the tab
    pub fn leave(&mut self) {
        if matches!(self.overlay, OverlayState::Warning { .. }) {
            self.overlay = OverlayState::Hidden;
        }
    }

    /// "Back to Safety" from the blocked screen; the driver closes the tab
    pub fn back_to_safety(&mut self) {
        if self.overlay == OverlayState::Blocked {
            self.overlay = OverlayState::Hidden;
        }
    }

    fn enter_warning(&mut self, reason: WarningReason) {
        if self.trusted {
            debug!(url = %self.url, ?reason, "page trusted, warning suppressed");
            return;
        }
        if self.overlay == OverlayState::Hidden {
            info!(url = %self.url, ?reason, "warning overlay shown");
            self.overlay = OverlayState::Warning {
                reason,
                countdown: Countdown::new(self.countdown_start),
            };
        }
    }

    /// Guarded page URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current shield status
    pub fn shield(&self) -> ShieldStatus {
        self.shield
    }

    /// Current overlay state
    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    /// Whether the suspicious banner is up
    pub fn banner(&self) -> bool {
        self.banner
    }

    /// Whether the user trusted this page for the session
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// Summary for the expanded shield panel
    pub fn security_report(&self) -> ShieldReport {
        ShieldReport {
            domain: domain_of(&self.url),
            encrypted: self.url.starts_with("https://"),
            status: self.shield,
        }
    }
}

/// Host portion of a URL, without scheme, path or port
fn domain_of(url: &str) -> String {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    host.split(':').next().unwrap_or("").to_string()
}

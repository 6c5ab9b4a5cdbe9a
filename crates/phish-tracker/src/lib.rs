//! ZeroPhish Tracker - per-tab redirect chain detection
//!
//! Tracks main-frame navigations per browser tab. A normal navigation
//! resets the tab's chain; redirects extend it. Once a chain reaches the
//! suspicion threshold every further redirect re-emits the grown chain,
//! so downstream consumers see the escalation, not just its onset.

#![warn(missing_docs)]

use chrono::Utc;
use dashmap::DashMap;
use phish_common::{ChainHop, NavigationEvent, SuspiciousChain, TabId};
use tracing::{debug, warn};

/// Chain length at which emission starts
pub const DEFAULT_THRESHOLD: usize = 3;

/// Redirect chain store, keyed by tab
///
/// Owned by the background context and handle-passed; chain lifecycle is
/// tied to tab lifecycle via [`ChainStore::remove_tab`].
pub struct ChainStore {
    chains: DashMap<TabId, Vec<ChainHop>>,
    threshold: usize,
}

impl ChainStore {
    /// Store with the default threshold
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    /// Store with a custom threshold
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            chains: DashMap::new(),
            threshold,
        }
    }

    /// Feed one navigation through the tracker
    ///
    /// Returns the current chain whenever it sits at or above the
    /// threshold, once per qualifying redirect. Subframe navigations are
    /// ignored entirely.
    pub fn observe(&self, event: &NavigationEvent) -> Option<SuspiciousChain> {
        if !event.main_frame {
            return None;
        }

        let hop = ChainHop {
            url: event.url.clone(),
            timestamp: event.timestamp,
        };

        if event.transition.is_redirect() {
            let mut chain = self.chains.entry(event.tab).or_default();
            chain.push(hop);
            debug!(tab = %event.tab, length = chain.len(), "redirect appended");

            if chain.len() >= self.threshold {
                warn!(tab = %event.tab, length = chain.len(), "suspicious redirect chain");
                return Some(SuspiciousChain {
                    tab: event.tab,
                    urls: chain.iter().map(|h| h.url.clone()).collect(),
                    detected_at: Utc::now(),
                });
            }
            None
        } else {
            // Fresh navigation: the chain restarts at this hop.
            self.chains.insert(event.tab, vec![hop]);
            None
        }
    }

    /// Drop all state for a closed tab
    pub fn remove_tab(&self, tab: TabId) {
        if self.chains.remove(&tab).is_some() {
            debug!(%tab, "chain discarded");
        }
    }

    /// Current chain length for a tab
    pub fn chain_len(&self, tab: TabId) -> usize {
        self.chains.get(&tab).map(|c| c.len()).unwrap_or(0)
    }

    /// Number of tabs with tracked chains
    pub fn tracked_tabs(&self) -> usize {
        self.chains.len()
    }
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phish_common::Transition;

    fn nav(tab: i32, url: &str, transition: Transition) -> NavigationEvent {
        NavigationEvent::main_frame(TabId(tab), url, transition)
    }

    #[test]
    fn test_emission_starts_at_threshold_and_repeats() {
        let store = ChainStore::new();
        let mut emissions = 0;

        for i in 0..5 {
            let url = format!("https://hop{i}.example");
            if store
                .observe(&nav(1, &url, Transition::ServerRedirect))
                .is_some()
            {
                emissions += 1;
            }
        }

        // Lengths 3, 4 and 5 each emit.
        assert_eq!(emissions, 3);
        assert_eq!(store.chain_len(TabId(1)), 5);
    }

    #[test]
    fn test_normal_navigation_resets_chain() {
        let store = ChainStore::new();

        store.observe(&nav(1, "https://a.example", Transition::ServerRedirect));
        store.observe(&nav(1, "https://b.example", Transition::ServerRedirect));
        assert_eq!(store.chain_len(TabId(1)), 2);

        store.observe(&nav(1, "https://fresh.example", Transition::Normal));
        assert_eq!(store.chain_len(TabId(1)), 1);
    }

    #[test]
    fn test_chain_grows_from_normal_origin() {
        let store = ChainStore::new();

        assert!(store
            .observe(&nav(1, "https://a.example", Transition::Normal))
            .is_none());
        assert!(store
            .observe(&nav(1, "https://b.example", Transition::ServerRedirect))
            .is_none());

        let third = store
            .observe(&nav(1, "https://c.example", Transition::ServerRedirect))
            .expect("threshold reached");
        assert_eq!(
            third.urls,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );

        let fourth = store
            .observe(&nav(1, "https://d.example", Transition::ClientRedirect))
            .expect("still above threshold");
        assert_eq!(fourth.urls.len(), 4);
        assert_eq!(fourth.urls[3], "https://d.example");
        assert_eq!(fourth.tab, TabId(1));
    }

    #[test]
    fn test_subframes_are_ignored() {
        let store = ChainStore::new();

        for i in 0..4 {
            let url = format!("https://frame{i}.example");
            let event =
                NavigationEvent::subframe(TabId(1), url, Transition::ServerRedirect);
            assert!(store.observe(&event).is_none());
        }
        assert_eq!(store.chain_len(TabId(1)), 0);
    }

    #[test]
    fn test_tabs_are_independent() {
        let store = ChainStore::new();

        store.observe(&nav(1, "https://a.example", Transition::ServerRedirect));
        store.observe(&nav(2, "https://b.example", Transition::ServerRedirect));

        assert_eq!(store.chain_len(TabId(1)), 1);
        assert_eq!(store.chain_len(TabId(2)), 1);
        assert_eq!(store.tracked_tabs(), 2);
    }

    #[test]
    fn test_tab_close_discards_chain() {
        let store = ChainStore::new();

        store.observe(&nav(1, "https://a.example", Transition::ServerRedirect));
        store.observe(&nav(1, "https://b.example", Transition::ServerRedirect));
        store.remove_tab(TabId(1));

        assert_eq!(store.chain_len(TabId(1)), 0);
        assert_eq!(store.tracked_tabs(), 0);
    }
}

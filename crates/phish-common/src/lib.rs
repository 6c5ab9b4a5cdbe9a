//! ZeroPhish Common - Shared types for the phishing protection pipeline
//!
//! This crate provides the domain vocabulary used by every other member
//! of the workspace:
//! - Risk verdicts and threat levels
//! - Phishing reports and redirect records
//! - Browser navigation events
//! - Error handling

#![warn(missing_docs)]

pub mod error;
pub mod nav;
pub mod report;
pub mod verdict;

pub use error::*;
pub use nav::*;
pub use report::*;
pub use verdict::*;

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counter for pipeline metrics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = AtomicCounter::new(0);
        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }
}

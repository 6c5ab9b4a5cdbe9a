//! Overlay countdown timer

use std::time::Duration;

/// Wall-clock interval between ticks
pub const TICK: Duration = Duration::from_millis(10);

/// Seconds removed per tick
pub const TICK_STEP: f64 = 0.01;

/// Default countdown length in seconds
pub const DEFAULT_START_SECS: f64 = 5.0;

/// Grace timer shown on the warning overlay
///
/// Tracked in whole ticks so expiry is exact; the fractional seconds
/// surface only in [`Countdown::display`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    ticks: i64,
}

impl Countdown {
    /// Countdown over the given number of seconds
    pub fn new(start_secs: f64) -> Self {
        Self {
            ticks: (start_secs / TICK_STEP).round() as i64,
        }
    }

    /// Advance one tick; true once the timer has run out
    pub fn tick(&mut self) -> bool {
        self.ticks -= 1;
        self.expired()
    }

    /// Whether the timer has run out
    pub fn expired(&self) -> bool {
        self.ticks <= 0
    }

    /// Remaining seconds (negative once expired)
    pub fn remaining_secs(&self) -> f64 {
        self.ticks as f64 * TICK_STEP
    }

    /// Two-decimal display form, always non-negative
    pub fn display(&self) -> String {
        format!("{:.2}", self.remaining_secs().abs())
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_START_SECS)
    }
}

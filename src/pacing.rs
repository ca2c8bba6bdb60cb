//! Randomized politeness delays between crawl actions.
//!
//! Hitting search engines and publisher sites at machine speed gets the
//! tool blocked. Every page navigation and every per-result action first
//! waits a random interval drawn from a band, so the traffic pattern
//! resembles a person reading. The waits are part of the crawl behavior
//! itself; zeroing them is supported only for tests and the `--fast`
//! switch.
//!
//! # Example
//!
//! ```no_run
//! use paperharvest_core::pacing::PacingProfile;
//!
//! # async fn example() {
//! let pacing = PacingProfile::standard();
//! pacing.page_load.wait().await; // 10-20 s before reading a page
//! pacing.per_result.wait().await; // 5-10 s between results
//! # }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::trace;

/// A uniformly random wait bounded by `min` and `max` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    /// Creates a band between `min` and `max`. Swapped bounds are
    /// normalized rather than rejected.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Band between `min_secs` and `max_secs` whole seconds.
    #[must_use]
    pub fn seconds(min_secs: u64, max_secs: u64) -> Self {
        Self::new(Duration::from_secs(min_secs), Duration::from_secs(max_secs))
    }

    /// A zero-width band that never sleeps.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draws one wait from the band.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        let wait_ms = rand::thread_rng().gen_range(min_ms..=max_ms);
        Duration::from_millis(wait_ms)
    }

    /// Sleeps for a freshly drawn wait. A zero-width band returns
    /// immediately without touching the timer.
    pub async fn wait(&self) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        trace!(delay_ms = delay.as_millis(), "politeness wait");
        tokio::time::sleep(delay).await;
    }
}

/// The three pacing bands the crawl flows share.
///
/// `page_load` runs after navigating to a new page, `per_result` between
/// consecutive results or queue items, and `settle` after small in-page
/// actions such as opening a viewer tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingProfile {
    pub page_load: Pacing,
    pub per_result: Pacing,
    pub settle: Pacing,
}

impl PacingProfile {
    /// The production bands: 10-20 s page loads, 5-10 s per result,
    /// 2-5 s settling.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            page_load: Pacing::seconds(10, 20),
            per_result: Pacing::seconds(5, 10),
            settle: Pacing::seconds(2, 5),
        }
    }

    /// All-zero bands for tests and `--fast` runs.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            page_load: Pacing::none(),
            per_result: Pacing::none(),
            settle: Pacing::none(),
        }
    }
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self::standard()
    }
}

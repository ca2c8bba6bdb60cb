//! Retry logic for transient download and parse failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying errors and determining retry behavior.
//!
//! # Overview
//!
//! When an operation fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//!
//! The [`RetryPolicy`] then decides whether to retry based on failure type
//! and attempt count. Two backoff shapes cover the crate's needs: HTTP
//! fetches use exponential backoff with jitter, while answer-payload parse
//! retries use a short fixed pause.
//!
//! # Example
//!
//! ```
//! use paperharvest_core::download::{
//!     DownloadError, RetryPolicy, RetryDecision, classify_error,
//! };
//!
//! let policy = RetryPolicy::http();
//! let error = DownloadError::http_status("https://example.com/file.pdf", 503);
//! let failure_type = classify_error(&error);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;

/// Default maximum attempts for both policy shapes.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (1 second).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default maximum delay cap (16 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Fixed pause between answer-payload parse attempts.
const PARSE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Maximum jitter added to exponential delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of failure types.
///
/// Used to determine whether a failed operation should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection refused, 408/429, 5xx.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 403 after the User-Agent fallback,
    /// invalid URL, local IO failure.
    Permanent,
}

/// Decision on whether to retry a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// How retry delays grow across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backoff {
    /// Same delay every attempt.
    Fixed(Duration),
    /// `base * multiplier^(attempt-1)`, capped, plus jitter.
    Exponential,
}

/// Configuration for retry behavior.
///
/// # Shapes
///
/// - [`RetryPolicy::http`] - 3 attempts, exponential 1s/2s/4s-style delays
///   with jitter, capped at 16s
/// - [`RetryPolicy::json_parse`] - 3 attempts, flat 2s pause
/// - [`RetryPolicy::no_delay`] - instant retries for tests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    backoff: Backoff,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::http()
    }
}

impl RetryPolicy {
    /// Policy for HTTP fetches: exponential backoff with jitter.
    #[must_use]
    pub fn http() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            backoff: Backoff::Exponential,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Policy for answer-payload JSON parsing: three attempts with a flat
    /// two-second pause between them.
    #[must_use]
    pub fn json_parse() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            backoff: Backoff::Fixed(PARSE_RETRY_DELAY),
            base_delay: PARSE_RETRY_DELAY,
            max_delay: PARSE_RETRY_DELAY,
            backoff_multiplier: 1.0,
        }
    }

    /// Policy with zero delay between attempts, for tests.
    #[must_use]
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(Duration::ZERO),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Returns a copy of this policy with a different attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry a failed operation.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay before the retry following failed `attempt`.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential => {
                let base_ms = self.base_delay.as_millis() as f64;
                let exponent = f64::from(attempt.saturating_sub(1));
                let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
                let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
                Duration::from_millis(capped_ms as u64) + calculate_jitter()
            }
        }
    }
}

/// Generates random jitter between 0 and `MAX_JITTER`.
///
/// Jitter spreads out retries when multiple fetches fail at once against
/// the same host.
fn calculate_jitter() -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=MAX_JITTER.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Returns true for HTTP status codes worth retrying.
///
/// Request timeout (408), rate limiting (429), and server errors (5xx)
/// may clear on their own; every other status reflects a request that
/// will keep failing.
#[must_use]
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// Classifies a download error into a failure type for retry decisions.
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | HTTP 408/429/5xx | Transient | May clear on its own |
/// | Other HTTP status | Permanent | Request will keep failing |
/// | Timeout | Transient | Network may recover |
/// | Network | Transient | Server may come back |
/// | IO | Permanent | Local file system issue |
/// | InvalidUrl | Permanent | Won't succeed |
#[instrument]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => {
            if is_transient_status(*status) {
                FailureType::Transient
            } else {
                FailureType::Permanent
            }
        }
        DownloadError::Timeout { .. } | DownloadError::Network { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

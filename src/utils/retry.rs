//! Retry utilities: backoff builders for ensemble session creation.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Base delay between ensemble connection attempts.
pub const ENSEMBLE_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retries after the first failed attempt.
pub const ENSEMBLE_RETRY_MAX: usize = 3;

/// Backoff for opening ensemble sessions.
///
/// - Min delay: 1s
/// - Max attempts: 3 retries after the initial attempt
/// - Jitter enabled
pub fn ensemble_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(ENSEMBLE_RETRY_BASE_DELAY)
        .with_max_times(ENSEMBLE_RETRY_MAX)
        .with_jitter()
}

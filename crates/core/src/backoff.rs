//! Exponential backoff with jitter for job-level retries.
//!
//! Provider-call failures are handled locally by the router fallback;
//! this module governs the delay between whole-job retry attempts and
//! the long mandated pause after a quota rejection.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Quota backoff
// ---------------------------------------------------------------------------

/// Minimum pause after a provider quota rejection before the job is
/// retried. Quota windows reset on the hour at every backend we
/// integrate with.
pub const QUOTA_BACKOFF: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Retry configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Maximum number of automatic retries before the job fails
    /// terminally.
    pub max_retries: u32,
    /// Jitter fraction: the final delay is scaled by a uniform factor
    /// in `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            multiplier: 2.0,
            max_retries: 3,
            jitter: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Delay calculation
// ---------------------------------------------------------------------------

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Base delay for the given retry attempt (0-based), before jitter.
pub fn delay_for_attempt(attempt: u32, config: &RetryConfig) -> Duration {
    let mut delay = config.initial_delay;
    for _ in 0..attempt {
        delay = next_delay(delay, config);
    }
    delay
}

/// Apply uniform jitter to a delay.
///
/// Scales by a random factor in `[1 - jitter, 1 + jitter]`; a jitter
/// of 0.0 returns the delay unchanged.
pub fn jittered(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return delay;
    }
    let jitter = jitter.min(1.0);
    let factor = 1.0 + rand::Rng::random_range(&mut rand::rng(), -jitter..=jitter);
    Duration::from_millis((delay.as_millis() as f64 * factor) as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = RetryConfig::default();
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(4));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = RetryConfig::default();
        let mut delay = config.initial_delay;
        let expected = [2, 4, 8, 16, 32, 64, 120, 120];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[test]
    fn delay_for_attempt_matches_sequence() {
        let config = RetryConfig::default();
        assert_eq!(delay_for_attempt(0, &config), Duration::from_secs(2));
        assert_eq!(delay_for_attempt(1, &config), Duration::from_secs(4));
        assert_eq!(delay_for_attempt(2, &config), Duration::from_secs(8));
        assert_eq!(delay_for_attempt(10, &config), Duration::from_secs(120));
    }

    #[test]
    fn jitter_zero_is_identity() {
        let d = Duration::from_secs(10);
        assert_eq!(jittered(d, 0.0), d);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let d = Duration::from_secs(10);
        for _ in 0..100 {
            let j = jittered(d, 0.2);
            assert!(j >= Duration::from_secs(8), "jittered too low: {j:?}");
            assert!(j <= Duration::from_secs(12), "jittered too high: {j:?}");
        }
    }

    #[test]
    fn quota_backoff_is_at_least_an_hour() {
        assert!(QUOTA_BACKOFF >= Duration::from_secs(3600));
    }
}

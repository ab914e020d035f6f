//! Bounded retry with configurable backoff.
//!
//! Attempts run strictly one after another. Once the budget is spent the
//! last error is handed back unchanged so callers can still classify it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;

// == Backoff ==
/// Delay applied between two consecutive attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `initial * multiplier^(n-1)` after the n-th failure, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl Backoff {
    /// No delay at all, used by tests that must not wait.
    pub const NONE: Backoff = Backoff::Fixed(Duration::ZERO);

    /// Delay to wait after the `failed_attempt`-th attempt (1-based) failed.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = i32::try_from(failed_attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            }
        }
    }
}

// == Retry Policy ==
/// Re-invokes a fallible async operation up to `max_attempts` times in total.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Builds the policy described by the retry section of the configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        let backoff = if config.multiplier > 1.0 {
            Backoff::Exponential {
                initial: config.wait,
                multiplier: config.multiplier,
                max: config.max_wait,
            }
        } else {
            Backoff::Fixed(config.wait)
        };
        Self::new(config.max_attempts, backoff)
    }

    /// A policy that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self::new(1, Backoff::NONE)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    // == Run ==
    /// Runs `operation` until it succeeds or the attempt budget is exhausted.
    ///
    /// The delay between attempts is a timer, never a blocking sleep. The
    /// error of the final attempt is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        attempts = attempt,
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff.delay_for(attempt);
                    debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn failing_until(success_on: u32, calls: &AtomicU32) -> Result<f64, UpstreamError> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= success_on {
            Ok(10.0)
        } else {
            Err(UpstreamError(format!("failure #{n}")))
        }
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed(Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(5), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
            max: Duration::from_millis(1000),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(10), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_backoff_large_attempts_stay_at_max() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(50),
            multiplier: 1.5,
            max: Duration::from_secs(1),
        };
        for attempt in [64, i32::MAX as u32, i32::MAX as u32 + 2, u32::MAX - 1, u32::MAX] {
            assert_eq!(backoff.delay_for(attempt), Duration::from_secs(1), "attempt {attempt}");
        }
    }

    #[test]
    fn test_from_config_picks_backoff_shape() {
        let fixed = RetryPolicy::from_config(&RetryConfig::default());
        assert_eq!(fixed.backoff(), &Backoff::Fixed(Duration::from_millis(200)));

        let config = RetryConfig {
            multiplier: 2.0,
            ..RetryConfig::default()
        };
        let exponential = RetryPolicy::from_config(&config);
        assert!(matches!(exponential.backoff(), Backoff::Exponential { .. }));
        assert_eq!(exponential.max_attempts(), 3);
    }

    #[tokio::test]
    async fn test_succeeds_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::NONE);

        let result = policy.run(|| async { failing_until(1, &calls) }).await;

        assert_eq!(result, Ok(10.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::NONE);

        let result = policy.run(|| async { failing_until(3, &calls) }).await;

        assert_eq!(result, Ok(10.0));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::NONE);

        let result = policy.run(|| async { failing_until(100, &calls) }).await;

        assert_eq!(result, Err(UpstreamError("failure #3".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::single_attempt();

        let result = policy.run(|| async { failing_until(2, &calls) }).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Backoff::NONE).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_backoff_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(250)));
        let started = Instant::now();

        let result = policy.run(|| async { failing_until(100, &calls) }).await;

        assert!(result.is_err());
        // Two waits: after attempt 1 and after attempt 2, none after the last.
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }
}

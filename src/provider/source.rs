//! Simulated external percentage source.
//!
//! Failure injection sits behind [`FailurePlan`] so tests can script exact
//! success/failure sequences instead of relying on probability.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::UpstreamError;

// == Percentage Source ==
/// A remote dependency producing the current percentage.
#[async_trait]
pub trait PercentageSource: Send + Sync {
    /// Makes one call to the source.
    async fn fetch(&self) -> Result<f64, UpstreamError>;
}

// == Failure Plan ==
/// Decides whether the next simulated call fails.
pub trait FailurePlan: Send + Sync + Debug {
    fn should_fail(&self) -> bool;
}

/// Fails each call independently with probability `rate`.
#[derive(Debug, Clone)]
pub struct RandomFailures {
    rate: f64,
}

impl RandomFailures {
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self { rate }
    }
}

impl FailurePlan for RandomFailures {
    fn should_fail(&self) -> bool {
        rand::thread_rng().gen_bool(self.rate)
    }
}

/// Replays a fixed sequence of outcomes, then repeats `then` forever.
#[derive(Debug)]
pub struct ScriptedFailures {
    script: Mutex<VecDeque<bool>>,
    then: bool,
}

impl ScriptedFailures {
    /// `script[i]` is `true` when call `i` should fail.
    pub fn new(script: impl IntoIterator<Item = bool>, then: bool) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            then,
        }
    }

    pub fn always_fail() -> Self {
        Self::new([], true)
    }

    pub fn never_fail() -> Self {
        Self::new([], false)
    }
}

impl FailurePlan for ScriptedFailures {
    fn should_fail(&self) -> bool {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.then)
    }
}

// == Simulated Source ==
/// Stand-in for the external percentage service.
///
/// Failing calls return immediately; successful calls resolve after `delay`.
#[derive(Debug)]
pub struct SimulatedSource {
    percentage: f64,
    delay: Duration,
    failures: Arc<dyn FailurePlan>,
    calls: AtomicU64,
}

impl SimulatedSource {
    pub fn new(percentage: f64, delay: Duration, failures: Arc<dyn FailurePlan>) -> Self {
        Self {
            percentage,
            delay,
            failures,
            calls: AtomicU64::new(0),
        }
    }

    /// Source with random failures at the configured rate.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            config.percentage_value,
            config.delay,
            Arc::new(RandomFailures::new(config.failure_rate)),
        )
    }

    /// Number of times [`PercentageSource::fetch`] has been invoked.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PercentageSource for SimulatedSource {
    async fn fetch(&self) -> Result<f64, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(call, "Calling simulated percentage service");

        if self.failures.should_fail() {
            warn!(call, "Simulated percentage service failure");
            return Err(UpstreamError(
                "simulated external service error".to_string(),
            ));
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        info!(call, percentage = self.percentage, "Simulated percentage service responded");
        Ok(self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_scripted_failures_then_default() {
        let plan = ScriptedFailures::new([true, false], true);
        assert!(plan.should_fail());
        assert!(!plan.should_fail());
        assert!(plan.should_fail());
        assert!(plan.should_fail());
    }

    #[test]
    fn test_random_failures_extremes() {
        let never = RandomFailures::new(0.0);
        let always = RandomFailures::new(1.0);
        for _ in 0..100 {
            assert!(!never.should_fail());
            assert!(always.should_fail());
        }
    }

    #[test]
    fn test_random_failures_clamps_rate() {
        assert!(RandomFailures::new(7.0).should_fail());
        assert!(!RandomFailures::new(-1.0).should_fail());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_waits_for_delay() {
        let source = SimulatedSource::new(
            10.0,
            Duration::from_millis(500),
            Arc::new(ScriptedFailures::never_fail()),
        );
        let started = Instant::now();

        assert_eq!(source.fetch().await, Ok(10.0));
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_immediate() {
        let source = SimulatedSource::new(
            10.0,
            Duration::from_millis(500),
            Arc::new(ScriptedFailures::always_fail()),
        );
        let started = Instant::now();

        assert!(source.fetch().await.is_err());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}

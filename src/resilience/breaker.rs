//! Circuit breaker guarding calls to a failing dependency.
//!
//! # States
//! - Closed: calls pass through, outcomes fill a count-based sliding window
//! - Open: calls fail fast without touching the dependency
//! - Half-Open: a limited number of trial calls probe for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open:     window holds >= minimum_calls outcomes and failure rate > threshold
//! Open → Half-Open:  first call after wait_in_open has elapsed
//! Half-Open → Closed: a trial call succeeds (window is cleared)
//! Half-Open → Open:  a trial call fails (wait timer restarts)
//! ```

use std::collections::VecDeque;
use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::BreakerConfig;

// == Circuit State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

// == Breaker Error ==
/// Failure of a call made through the breaker.
#[derive(Error, Debug, PartialEq)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation
    #[error("circuit breaker is open")]
    Open,
    /// The operation ran and failed
    #[error("{0}")]
    Inner(E),
}

// == Snapshot ==
/// Point-in-time view of the breaker for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    /// Failure percentage over the window, `None` until `minimum_calls` are buffered
    pub failure_rate: Option<f64>,
}

#[derive(Debug)]
struct Machine {
    state: CircuitState,
    /// Most recent outcomes, `true` marks a failure
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
}

impl Machine {
    fn failures(&self) -> usize {
        self.window.iter().filter(|failed| **failed).count()
    }
}

// == Circuit Breaker ==
/// Three-state circuit breaker with a count-based sliding window.
///
/// All state lives behind one lock that is never held across the guarded
/// call, so concurrent outcome recordings are serialized.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    machine: Mutex<Machine>,
}

impl CircuitBreaker {
    // == Constructor ==
    /// Creates a closed breaker.
    ///
    /// # Arguments
    /// * `name` - Label used in log lines
    /// * `config` - Thresholds, window size and open wait
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let capacity = config.sliding_window_size.max(1);
        Self {
            name: name.into(),
            config,
            machine: Mutex::new(Machine {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(capacity),
                opened_at: None,
                half_open_in_flight: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state as last written by a transition.
    ///
    /// An open breaker whose wait has elapsed still reports `Open` until the
    /// next call moves it to `HalfOpen`.
    pub async fn state(&self) -> CircuitState {
        self.machine.lock().await.state
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let machine = self.machine.lock().await;
        let failed_calls = machine.failures();
        let buffered_calls = machine.window.len();
        BreakerSnapshot {
            state: machine.state,
            buffered_calls,
            failed_calls,
            failure_rate: (buffered_calls >= self.minimum_calls())
                .then(|| failed_calls as f64 * 100.0 / buffered_calls as f64),
        }
    }

    // == Call ==
    /// Runs `operation` if the breaker permits it and records the outcome.
    ///
    /// When the breaker refuses, `operation` is never invoked.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire().await {
            return Err(BreakerError::Open);
        }

        match operation().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(BreakerError::Inner(err))
            }
        }
    }

    // == Permission ==
    /// Decides whether a call may proceed, moving Open to HalfOpen once the
    /// wait has elapsed.
    pub async fn try_acquire(&self) -> bool {
        let mut machine = self.machine.lock().await;

        if machine.state == CircuitState::Open {
            let waited_enough = machine
                .opened_at
                .map(|opened| opened + self.config.wait_in_open <= Instant::now())
                .unwrap_or(true);
            if !waited_enough {
                return false;
            }
            machine.state = CircuitState::HalfOpen;
            machine.half_open_in_flight = 0;
            info!(breaker = %self.name, "Circuit breaker half-open, permitting trial calls");
        }

        let state = machine.state;
        match state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if machine.half_open_in_flight < self.config.permitted_calls_in_half_open {
                    machine.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => false,
        }
    }

    // == Record Success ==
    pub async fn on_success(&self) {
        let mut machine = self.machine.lock().await;
        let state = machine.state;
        match state {
            CircuitState::Closed => {
                self.record(&mut machine, false);
                self.evaluate(&mut machine);
            }
            CircuitState::HalfOpen => {
                machine.state = CircuitState::Closed;
                machine.window.clear();
                machine.opened_at = None;
                machine.half_open_in_flight = 0;
                info!(breaker = %self.name, "Circuit breaker closed after successful trial call");
            }
            // Late outcome of a call admitted before the breaker opened.
            CircuitState::Open => {}
        }
    }

    // == Record Failure ==
    pub async fn on_failure(&self) {
        let mut machine = self.machine.lock().await;
        let state = machine.state;
        match state {
            CircuitState::Closed => {
                self.record(&mut machine, true);
                self.evaluate(&mut machine);
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "Trial call failed, circuit breaker re-opened");
                Self::open(&mut machine);
            }
            CircuitState::Open => {}
        }
    }

    fn record(&self, machine: &mut Machine, failed: bool) {
        if machine.window.len() >= self.config.sliding_window_size.max(1) {
            machine.window.pop_front();
        }
        machine.window.push_back(failed);
    }

    /// Opens a closed breaker once the window is full enough and its
    /// failure rate exceeds the threshold. Runs after every recorded outcome.
    fn evaluate(&self, machine: &mut Machine) {
        let buffered = machine.window.len();
        if buffered < self.minimum_calls() {
            return;
        }
        let rate = machine.failures() as f64 * 100.0 / buffered as f64;
        if rate > self.config.failure_rate_threshold {
            warn!(
                breaker = %self.name,
                failure_rate = rate,
                threshold = self.config.failure_rate_threshold,
                "Circuit breaker opened"
            );
            Self::open(machine);
        }
    }

    fn open(machine: &mut Machine) {
        machine.state = CircuitState::Open;
        machine.opened_at = Some(Instant::now());
        machine.half_open_in_flight = 0;
        machine.window.clear();
    }

    /// Minimum buffered calls, never more than the window can hold.
    fn minimum_calls(&self) -> usize {
        self.config
            .minimum_calls
            .clamp(1, self.config.sliding_window_size.max(1))
    }
}

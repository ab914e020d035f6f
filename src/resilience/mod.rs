//! Resilience Module
//!
//! Policies wrapped around the call to the external percentage source.
//!
//! # Composition
//! ```text
//! CircuitBreaker::call
//!     → RetryPolicy::run (max_attempts, backoff between attempts)
//!         → PercentageSource::fetch
//! ```
//! The breaker is outermost: a whole retry sequence counts as one outcome,
//! and an open breaker never starts a retry sequence.

mod breaker;
mod retry;

pub use breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retry::{Backoff, RetryPolicy};

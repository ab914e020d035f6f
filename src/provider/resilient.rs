//! Resilient percentage provider.
//!
//! # Data Flow
//! ```text
//! fetch_percentage()
//!     → CircuitBreaker::call → RetryPolicy::run → PercentageSource::fetch
//!     → Ok:  write through to the value store (failures logged, ignored)
//!     → Err: read the value store
//!             → hit:  cached value
//!             → miss: ServiceUnavailable carrying the upstream cause
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::cache::ValueStore;
use crate::config::CacheConfig;
use crate::error::{AppError, Result};
use crate::provider::PercentageSource;
use crate::resilience::{BreakerError, CircuitBreaker, RetryPolicy};

// == Percentage Provider ==
/// Anything able to produce the current percentage for a calculation.
#[async_trait]
pub trait PercentageProvider: Send + Sync {
    async fn fetch_percentage(&self) -> Result<f64>;
}

// == Resilient Provider ==
/// Breaker-wrapped, retried source with a write-through fallback cache.
///
/// Cloning is cheap and clones share the breaker, store and source.
#[derive(Clone)]
pub struct ResilientProvider {
    source: Arc<dyn PercentageSource>,
    store: Arc<dyn ValueStore<f64>>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    cache_key: Arc<str>,
    cache_ttl: Duration,
}

impl ResilientProvider {
    // == Constructor ==
    /// # Arguments
    /// * `source` - The unreliable upstream
    /// * `store` - Fallback cache, written on every successful fetch
    /// * `breaker` - Breaker guarding the whole retry sequence
    /// * `retry` - Policy applied inside the breaker
    /// * `cache` - Key and TTL used for the cached percentage
    pub fn new(
        source: Arc<dyn PercentageSource>,
        store: Arc<dyn ValueStore<f64>>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            source,
            store,
            breaker,
            retry,
            cache_key: Arc::from(cache.key.as_str()),
            cache_ttl: cache.ttl,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    async fn resolve(&self) -> Result<f64> {
        let outcome = self
            .breaker
            .call(|| self.retry.run(|| self.source.fetch()))
            .await;

        let cause = match outcome {
            Ok(value) => {
                self.write_through(value).await;
                return Ok(value);
            }
            Err(BreakerError::Open) => AppError::CircuitOpen,
            Err(BreakerError::Inner(err)) => AppError::Upstream(err),
        };

        self.fallback(cause).await
    }

    async fn write_through(&self, value: f64) {
        match self.store.set(&self.cache_key, value, self.cache_ttl).await {
            Ok(()) => info!(
                key = %self.cache_key,
                value,
                ttl_secs = self.cache_ttl.as_secs(),
                "Percentage cached"
            ),
            Err(err) => warn!(
                key = %self.cache_key,
                error = %err,
                "Failed to cache percentage, returning fetched value anyway"
            ),
        }
    }

    async fn fallback(&self, cause: AppError) -> Result<f64> {
        warn!(
            key = %self.cache_key,
            cause = %cause,
            "Percentage service call failed, falling back to cache"
        );

        match self.store.get(&self.cache_key).await {
            Ok(Some(value)) => {
                warn!(key = %self.cache_key, value, "Serving cached percentage");
                Ok(value)
            }
            Ok(None) => {
                error!(key = %self.cache_key, "No cached percentage available");
                Err(AppError::unavailable(cause))
            }
            Err(err) => {
                error!(key = %self.cache_key, error = %err, "Cache read failed during fallback");
                Err(AppError::unavailable(cause))
            }
        }
    }
}

#[async_trait]
impl PercentageProvider for ResilientProvider {
    /// Runs the pipeline on its own task so a caller that stops waiting
    /// does not cut short retries or the cache write-through.
    async fn fetch_percentage(&self) -> Result<f64> {
        let provider = self.clone();
        tokio::spawn(async move { provider.resolve().await })
            .await
            .map_err(|err| AppError::Internal(format!("percentage fetch task failed: {err}")))?
    }
}

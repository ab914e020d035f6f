//! Configuration Module
//!
//! Handles loading and validating service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::audit::DEFAULT_MAX_RECORDS;
use crate::cache::DEFAULT_PERCENTAGE_KEY;

/// Reads `name` from the environment, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// == Source ==
/// Behaviour of the simulated external percentage source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Percentage returned on a successful call
    pub percentage_value: f64,
    /// Simulated latency of a successful call
    pub delay: Duration,
    /// Probability in `0.0..=1.0` that a call fails
    pub failure_rate: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            percentage_value: 10.0,
            delay: Duration::from_millis(500),
            failure_rate: 0.5,
        }
    }
}

// == Cache ==
/// Fallback cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Key the current percentage is stored under
    pub key: String,
    /// How long a written percentage stays valid
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_PERCENTAGE_KEY.to_string(),
            ttl: Duration::from_secs(30 * 60),
        }
    }
}

// == Retry ==
/// Retry policy settings.
///
/// A `multiplier` of 1.0 gives a fixed delay; anything above grows the delay
/// exponentially up to `max_wait`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub wait: Duration,
    /// Growth factor applied per further attempt
    pub multiplier: f64,
    /// Upper bound on any single delay
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait: Duration::from_millis(200),
            multiplier: 1.0,
            max_wait: Duration::from_secs(2),
        }
    }
}

// == Circuit Breaker ==
/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Failure percentage (0-100) the window must exceed to open the circuit
    pub failure_rate_threshold: f64,
    /// Number of most recent outcomes kept in the sliding window
    pub sliding_window_size: usize,
    /// Outcomes required in the window before the ratio is evaluated
    pub minimum_calls: usize,
    /// Time spent open before trial calls are let through
    pub wait_in_open: Duration,
    /// Concurrent trial calls permitted while half-open
    pub permitted_calls_in_half_open: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            minimum_calls: 5,
            wait_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
        }
    }
}

// == Rate Limit ==
/// Admission gate settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Bucket size, which is also the burst allowance
    pub capacity: u32,
    /// Tokens added back per second
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            refill_per_sec: 3.0,
        }
    }
}

// == History ==
/// Request history retention.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Records kept in memory; the oldest are dropped beyond this
    pub max_records: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub rate_limit: RateLimitConfig,
    pub history: HistoryConfig,
}

/// HTTP server and background task settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP server port
    pub port: u16,
    /// Interval between expired-entry sweeps of the cache
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` (8080), `CLEANUP_INTERVAL` seconds (30)
    /// - `PERCENTAGE_VALUE` (10.0), `PERCENTAGE_DELAY_MS` (500), `PERCENTAGE_FAILURE_RATE` (0.5)
    /// - `CACHE_KEY` (`percentage:current`), `CACHE_TTL_SECS` (1800)
    /// - `RETRY_MAX_ATTEMPTS` (3), `RETRY_WAIT_MS` (200), `RETRY_BACKOFF_MULTIPLIER` (1.0),
    ///   `RETRY_MAX_WAIT_MS` (2000)
    /// - `BREAKER_FAILURE_RATE_THRESHOLD` (50.0), `BREAKER_WINDOW_SIZE` (10),
    ///   `BREAKER_MINIMUM_CALLS` (5), `BREAKER_WAIT_OPEN_SECS` (10), `BREAKER_HALF_OPEN_CALLS` (1)
    /// - `RATE_LIMIT_CAPACITY` (3), `RATE_LIMIT_REFILL_PER_SEC` (3.0)
    /// - `HISTORY_MAX_RECORDS` (10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                port: env_or("SERVER_PORT", defaults.server.port),
                cleanup_interval: Duration::from_secs(env_or(
                    "CLEANUP_INTERVAL",
                    defaults.server.cleanup_interval.as_secs(),
                )),
            },
            source: SourceConfig {
                percentage_value: env_or("PERCENTAGE_VALUE", defaults.source.percentage_value),
                delay: Duration::from_millis(env_or(
                    "PERCENTAGE_DELAY_MS",
                    defaults.source.delay.as_millis() as u64,
                )),
                failure_rate: env_or("PERCENTAGE_FAILURE_RATE", defaults.source.failure_rate),
            },
            cache: CacheConfig {
                key: env_or("CACHE_KEY", defaults.cache.key),
                ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", defaults.cache.ttl.as_secs())),
            },
            retry: RetryConfig {
                max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
                wait: Duration::from_millis(env_or(
                    "RETRY_WAIT_MS",
                    defaults.retry.wait.as_millis() as u64,
                )),
                multiplier: env_or("RETRY_BACKOFF_MULTIPLIER", defaults.retry.multiplier),
                max_wait: Duration::from_millis(env_or(
                    "RETRY_MAX_WAIT_MS",
                    defaults.retry.max_wait.as_millis() as u64,
                )),
            },
            breaker: BreakerConfig {
                failure_rate_threshold: env_or(
                    "BREAKER_FAILURE_RATE_THRESHOLD",
                    defaults.breaker.failure_rate_threshold,
                ),
                sliding_window_size: env_or(
                    "BREAKER_WINDOW_SIZE",
                    defaults.breaker.sliding_window_size,
                ),
                minimum_calls: env_or("BREAKER_MINIMUM_CALLS", defaults.breaker.minimum_calls),
                wait_in_open: Duration::from_secs(env_or(
                    "BREAKER_WAIT_OPEN_SECS",
                    defaults.breaker.wait_in_open.as_secs(),
                )),
                permitted_calls_in_half_open: env_or(
                    "BREAKER_HALF_OPEN_CALLS",
                    defaults.breaker.permitted_calls_in_half_open,
                ),
            },
            rate_limit: RateLimitConfig {
                capacity: env_or("RATE_LIMIT_CAPACITY", defaults.rate_limit.capacity),
                refill_per_sec: env_or(
                    "RATE_LIMIT_REFILL_PER_SEC",
                    defaults.rate_limit.refill_per_sec,
                ),
            },
            history: HistoryConfig {
                max_records: env_or("HISTORY_MAX_RECORDS", defaults.history.max_records),
            },
        }
    }

    // == Validate ==
    /// Checks that every knob is within the range the pipeline can honour.
    ///
    /// Returns a description of the first offending value.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.source.failure_rate) {
            return Err(format!(
                "PERCENTAGE_FAILURE_RATE must be between 0.0 and 1.0, got {}",
                self.source.failure_rate
            ));
        }
        if !self.source.percentage_value.is_finite() || self.source.percentage_value < 0.0 {
            return Err("PERCENTAGE_VALUE must be a non-negative number".to_string());
        }
        if self.cache.key.is_empty() {
            return Err("CACHE_KEY cannot be empty".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("RETRY_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err("RETRY_BACKOFF_MULTIPLIER must be at least 1.0".to_string());
        }
        if !(0.0..=100.0).contains(&self.breaker.failure_rate_threshold) {
            return Err("BREAKER_FAILURE_RATE_THRESHOLD must be between 0 and 100".to_string());
        }
        if self.breaker.sliding_window_size == 0 || self.breaker.minimum_calls == 0 {
            return Err("BREAKER_WINDOW_SIZE and BREAKER_MINIMUM_CALLS must be at least 1".to_string());
        }
        if self.breaker.permitted_calls_in_half_open == 0 {
            return Err("BREAKER_HALF_OPEN_CALLS must be at least 1".to_string());
        }
        if self.rate_limit.capacity == 0 {
            return Err("RATE_LIMIT_CAPACITY must be at least 1".to_string());
        }
        if !self.rate_limit.refill_per_sec.is_finite() || self.rate_limit.refill_per_sec < 0.0 {
            return Err("RATE_LIMIT_REFILL_PER_SEC must be a non-negative number".to_string());
        }
        if self.history.max_records == 0 {
            return Err("HISTORY_MAX_RECORDS must be at least 1".to_string());
        }
        if self.server.cleanup_interval.is_zero() {
            return Err("CLEANUP_INTERVAL must be at least 1 second".to_string());
        }
        Ok(())
    }
}

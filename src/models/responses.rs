//! Response DTOs for the calculation API
//!
//! Defines the structure of outgoing HTTP response bodies.

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::resilience::{BreakerSnapshot, CircuitState};

/// Response body for the calculation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CalculationResponse {
    /// `(num1 + num2) * (1 + percentage / 100)`
    #[serde(with = "rust_decimal::serde::float")]
    pub result: Decimal,
}

impl CalculationResponse {
    pub fn new(result: Decimal) -> Self {
        Self { result }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while the breaker is not closed
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub circuit_breaker: BreakerSnapshot,
    pub cache: CacheStats,
}

impl HealthResponse {
    pub fn new(circuit_breaker: BreakerSnapshot, cache: CacheStats) -> Self {
        let status = match circuit_breaker.state {
            CircuitState::Closed => "healthy",
            CircuitState::Open | CircuitState::HalfOpen => "degraded",
        };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            circuit_breaker,
            cache,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// When the error was produced, ISO 8601
    pub timestamp: String,
    pub status: u16,
    /// Reason phrase of `status`
    pub error: String,
    /// What went wrong, safe to show to the caller
    pub message: String,
    /// Per-field problems, omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

//! API Handlers
//!
//! HTTP request handlers for each endpoint of the calculation service.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::debug;

use crate::admission::{AdmissionGate, RateLimiter};
use crate::audit::{HistoryLogger, HistoryRecord, HistoryRepository, Page};
use crate::cache::MemoryStore;
use crate::calculation::CalculationEngine;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{CalculationQuery, CalculationResponse, HealthResponse, HistoryQuery};
use crate::provider::{PercentageSource, ResilientProvider, SimulatedSource};
use crate::resilience::{CircuitBreaker, RetryPolicy};

/// Name the percentage breaker logs under
pub const PERCENTAGE_BREAKER: &str = "percentageService";

/// Application state shared across all handlers.
///
/// Every field is shared; cloning hands out new references to the same
/// breaker, cache, limiter and history.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CalculationEngine>,
    pub breaker: Arc<CircuitBreaker>,
    /// Fallback cache behind the percentage provider
    pub cache: Arc<MemoryStore<f64>>,
    pub history: Arc<dyn HistoryRepository>,
    pub history_logger: HistoryLogger,
    pub admission: Arc<AdmissionGate>,
}

impl AppState {
    /// Wires the full pipeline against the simulated percentage source.
    pub fn from_config(
        config: &Config,
        history: Arc<dyn HistoryRepository>,
        history_logger: HistoryLogger,
    ) -> Self {
        let source = Arc::new(SimulatedSource::from_config(&config.source));
        Self::with_source(config, source, history, history_logger)
    }

    /// Wires the full pipeline against any percentage source.
    ///
    /// # Arguments
    /// * `config` - Retry, breaker, cache and rate limit settings
    /// * `source` - Upstream the provider calls through breaker and retry
    /// * `history` - Repository the history endpoint reads from
    /// * `history_logger` - Channel the audit middleware writes to
    pub fn with_source(
        config: &Config,
        source: Arc<dyn PercentageSource>,
        history: Arc<dyn HistoryRepository>,
        history_logger: HistoryLogger,
    ) -> Self {
        let cache = Arc::new(MemoryStore::new());
        let breaker = Arc::new(CircuitBreaker::new(
            PERCENTAGE_BREAKER,
            config.breaker.clone(),
        ));
        let provider = ResilientProvider::new(
            source,
            cache.clone(),
            breaker.clone(),
            RetryPolicy::from_config(&config.retry),
            &config.cache,
        );
        let admission = AdmissionGate::with_default_exclusions(RateLimiter::from_config(
            &config.rate_limit,
        ));

        Self {
            engine: Arc::new(CalculationEngine::new(Arc::new(provider))),
            breaker,
            cache,
            history,
            history_logger,
            admission: Arc::new(admission),
        }
    }
}

/// Handler for GET /api/v1/calculations/sum-with-percentage
///
/// Adds `num1` and `num2` and applies the current percentage.
pub async fn calculate_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<CalculationQuery>, QueryRejection>,
) -> Result<Json<CalculationResponse>> {
    let Query(query) = query.map_err(|rejection| AppError::invalid_input(rejection.body_text()))?;
    let (num1, num2) = query.parse()?;

    let result = state.engine.calculate(Some(num1), Some(num2)).await?;
    Ok(Json(CalculationResponse::new(result)))
}

/// Handler for GET /api/v1/history
///
/// Returns one page of the request history, oldest first.
pub async fn history_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Page<HistoryRecord>>> {
    let Query(query) = query.map_err(|rejection| AppError::invalid_input(rejection.body_text()))?;
    let (page, size) = query.resolve();
    debug!(page, size, "Fetching call history");

    let page = state.history.find_page(page, size).await?;
    Ok(Json(page))
}

/// Handler for GET /health
///
/// Reports breaker state and fallback cache statistics.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let breaker = state.breaker.snapshot().await;
    let cache = state.cache.stats().await;
    Json(HealthResponse::new(breaker, cache))
}

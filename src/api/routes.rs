//! API Routes
//!
//! Configures the Axum router with all calculation service endpoints.

use axum::{middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{calculate_handler, health_handler, history_handler, AppState};
use crate::admission::admission_middleware;
use crate::audit::audit_middleware;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /api/v1/calculations/sum-with-percentage` - Sum with percentage applied
/// - `GET /api/v1/history` - Paged request history
/// - `GET /health` - Breaker and cache status
///
/// # Middleware (outermost first)
/// - Tracing: Logs all requests for debugging
/// - CORS: Allows any origin
/// - Admission: Global rate limit, excluded paths bypass it
/// - Audit: Records every `/api` request that reached a handler
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/api/v1/calculations/sum-with-percentage",
            get(calculate_handler),
        )
        .route("/api/v1/history", get(history_handler))
        .route_layer(middleware::from_fn_with_state(
            state.history_logger.clone(),
            audit_middleware,
        ));

    Router::new()
        .merge(api)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(
            state.admission.clone(),
            admission_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

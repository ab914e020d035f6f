//! API Module
//!
//! HTTP handlers and routing for the calculation service REST API.
//!
//! # Endpoints
//! - `GET /api/v1/calculations/sum-with-percentage?num1=&num2=` - Sum with percentage
//! - `GET /api/v1/history?page=&size=` - Paged request history
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

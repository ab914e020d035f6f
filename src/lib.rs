//! Resilient Calc - percentage calculation service with a fault-tolerant upstream
//!
//! Adds two numbers and applies a percentage obtained from an unreliable
//! external source, shielded by retries, a circuit breaker and a TTL cache
//! fallback. Inbound requests pass a global rate limiter and are recorded
//! in an asynchronously persisted history.

pub mod admission;
pub mod api;
pub mod audit;
pub mod cache;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod resilience;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::{spawn_cleanup_task, spawn_history_writer};

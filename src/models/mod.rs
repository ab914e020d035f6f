//! Request and Response models for the calculation API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! deserializing query strings and serializing HTTP response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{CalculationQuery, HistoryQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use responses::{CalculationResponse, ErrorResponse, HealthResponse};

//! Admission Module
//!
//! Global token-bucket rate limiting applied before any request work.

mod gate;
mod limiter;

pub use gate::{admission_middleware, AdmissionGate, DEFAULT_EXCLUDED_PATHS};
pub use limiter::RateLimiter;

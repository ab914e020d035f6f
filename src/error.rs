//! Error types for the calculation service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

// == Upstream Error ==
/// A single failed call against the external percentage source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("upstream failure: {0}")]
pub struct UpstreamError(pub String);

// == Store Error ==
/// Failure of the backing storage behind a value store.
///
/// A missing key is not an error; stores report it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backing storage could not be reached or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// == App Error ==
/// Unified error type for the calculation service.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required argument was missing or malformed
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        details: Vec<String>,
    },

    /// The external source failed on every attempt
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The circuit breaker rejected the call without contacting the source
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Neither the source nor the fallback cache produced a value
    #[error("percentage service unavailable and no cached value present")]
    ServiceUnavailable {
        #[source]
        cause: Box<AppError>,
    },

    /// Admission was denied by the rate limiter
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The value store failed
    #[error(transparent)]
    CacheStore(#[from] StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Creates an `InvalidInput` error without per-field details.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Wraps an upstream or breaker failure once the cache fallback is exhausted.
    pub fn unavailable(cause: AppError) -> Self {
        Self::ServiceUnavailable {
            cause: Box::new(cause),
        }
    }

    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_)
            | AppError::CircuitOpen
            | AppError::CacheStore(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::InvalidInput { message, details } => {
                ErrorResponse::new(status, message).with_details(details)
            }
            AppError::RateLimited => ErrorResponse::new(
                status,
                "Too many requests. Please wait before trying again.",
            ),
            AppError::ServiceUnavailable { cause } => {
                error!(cause = %cause, "Percentage service unavailable and cache empty");
                ErrorResponse::new(
                    status,
                    "The external service is temporarily unavailable and no cached value \
                     could be recovered. Please try again later.",
                )
            }
            other => {
                error!(error = %other, "Unexpected error while handling request");
                ErrorResponse::new(status, "An unexpected internal error occurred.")
            }
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the calculation service.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::invalid_input("num1 is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::unavailable(AppError::CircuitOpen).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unavailable_keeps_upstream_cause() {
        let err = AppError::unavailable(UpstreamError("simulated".to_string()).into());
        let source = err.source().expect("cause should be attached");
        assert!(source.to_string().contains("simulated"));
    }

    #[test]
    fn test_upstream_display_is_transparent() {
        let err: AppError = UpstreamError("timeout".to_string()).into();
        assert_eq!(err.to_string(), "upstream failure: timeout");
    }
}

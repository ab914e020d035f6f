//! Admission gate middleware.
//!
//! Consults the shared [`RateLimiter`] once per inbound request unless the
//! path is on the exclusion list.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::RateLimiter;
use crate::error::AppError;

/// Paths never subject to rate limiting.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &[
    "/swagger-ui.html",
    "/swagger-ui/**",
    "/v3/api-docs/**",
    "/api-docs/**",
    "/webjars/**",
    "/actuator/**",
    "/health",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    /// `base/**`: matches `base` and everything beneath it
    Subtree(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(base) => Self::Subtree(base.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Subtree(base) => path
                .strip_prefix(base.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

// == Admission Gate ==
pub struct AdmissionGate {
    limiter: RateLimiter,
    excluded: Vec<PathPattern>,
}

impl AdmissionGate {
    /// # Arguments
    /// * `limiter` - Bucket shared by all admitted requests
    /// * `excluded` - Exact paths, or `prefix/**` subtree patterns
    pub fn new<I, S>(limiter: RateLimiter, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            limiter,
            excluded: excluded
                .into_iter()
                .map(|p| PathPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    /// Gate with [`DEFAULT_EXCLUDED_PATHS`].
    pub fn with_default_exclusions(limiter: RateLimiter) -> Self {
        Self::new(limiter, DEFAULT_EXCLUDED_PATHS.iter().copied())
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded.iter().any(|p| p.matches(path))
    }

    /// Admits `path` if excluded or a token is available.
    pub fn admit(&self, path: &str) -> bool {
        self.is_excluded(path) || self.limiter.try_acquire()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

// == Middleware ==
/// Rejects the request with 429 when the bucket is empty.
pub async fn admission_middleware(
    State(gate): State<Arc<AdmissionGate>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();

    if gate.admit(path) {
        debug!(path, "Request admitted");
        Ok(next.run(request).await)
    } else {
        warn!(path, "Rate limit exceeded");
        Err(AppError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(capacity: u32) -> AdmissionGate {
        AdmissionGate::with_default_exclusions(RateLimiter::new(capacity, 0.0))
    }

    #[test]
    fn test_exact_and_subtree_exclusions() {
        let gate = gate(1);

        assert!(gate.is_excluded("/health"));
        assert!(gate.is_excluded("/swagger-ui.html"));
        assert!(gate.is_excluded("/swagger-ui/index.html"));
        assert!(gate.is_excluded("/actuator"));
        assert!(gate.is_excluded("/v3/api-docs/swagger-config"));

        assert!(!gate.is_excluded("/health/extra"));
        assert!(!gate.is_excluded("/actuatorx"));
        assert!(!gate.is_excluded("/api/v1/history"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_excluded_paths_do_not_spend_tokens() {
        let gate = gate(1);

        for _ in 0..10 {
            assert!(gate.admit("/health"));
        }
        assert!(gate.admit("/api/v1/history"));
        assert!(!gate.admit("/api/v1/history"));
        assert!(gate.admit("/actuator/info"));
    }
}

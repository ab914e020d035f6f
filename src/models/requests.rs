//! Request DTOs for the calculation API
//!
//! Defines the query parameters accepted by each endpoint.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Default page size for the history listing
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page size the history listing will serve
pub const MAX_PAGE_SIZE: usize = 100;

/// Query for `GET /api/v1/calculations/sum-with-percentage`
///
/// Kept as raw strings so every malformed field can be reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalculationQuery {
    pub num1: Option<String>,
    pub num2: Option<String>,
}

impl CalculationQuery {
    /// Parses both numbers.
    ///
    /// Each must be present, numeric and non-negative. Every violation is
    /// listed in the error details as `field: problem`.
    pub fn parse(&self) -> Result<(Decimal, Decimal)> {
        let mut details = Vec::new();
        let num1 = parse_operand("num1", self.num1.as_deref(), &mut details);
        let num2 = parse_operand("num2", self.num2.as_deref(), &mut details);

        match (num1, num2) {
            (Some(a), Some(b)) if details.is_empty() => Ok((a, b)),
            _ => Err(AppError::InvalidInput {
                message: "Validation failed".to_string(),
                details,
            }),
        }
    }
}

fn parse_operand(name: &str, raw: Option<&str>, details: &mut Vec<String>) -> Option<Decimal> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            details.push(format!("{name}: must not be null"));
            return None;
        }
    };

    let value = match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(value) => value,
        Err(_) => {
            details.push(format!("{name}: must be a number"));
            return None;
        }
    };

    if value.is_sign_negative() && !value.is_zero() {
        details.push(format!("{name}: must be greater than or equal to 0"));
        return None;
    }
    Some(value)
}

/// Query for `GET /api/v1/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl HistoryQuery {
    /// Zero-based page index and a size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn resolve(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(0);
        let size = self
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, size)
    }
}

//! Calculation Engine
//!
//! Combines two inputs with the externally sourced percentage:
//! `(a + b) * (1 + p / 100)`, where `p / 100` is rounded half-up to four
//! fractional digits before it is applied.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::provider::PercentageProvider;

/// Fractional digits kept in the percentage factor
pub const MULTIPLIER_SCALE: u32 = 4;

// == Pure Arithmetic ==
/// `1 + p / 100` with the fraction rounded half-up to [`MULTIPLIER_SCALE`] digits.
pub fn multiplier(percentage: Decimal) -> Decimal {
    let fraction = (percentage / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(MULTIPLIER_SCALE, RoundingStrategy::MidpointAwayFromZero);
    Decimal::ONE + fraction
}

/// Applies `percentage` to `sum`. Returns `None` if the product overflows.
pub fn apply_percentage(sum: Decimal, percentage: Decimal) -> Option<Decimal> {
    sum.checked_mul(multiplier(percentage))
        .map(|result| result.normalize())
}

// == Calculation Engine ==
pub struct CalculationEngine {
    provider: Arc<dyn PercentageProvider>,
}

impl CalculationEngine {
    pub fn new(provider: Arc<dyn PercentageProvider>) -> Self {
        Self { provider }
    }

    // == Calculate ==
    /// Sums `a` and `b` and applies the current percentage.
    ///
    /// Both inputs must be present. The HTTP layer already rejects missing,
    /// non-numeric and negative parameters in `CalculationQuery::parse`, so
    /// this check only fires for direct library callers. Provider errors are
    /// returned unchanged.
    pub async fn calculate(&self, a: Option<Decimal>, b: Option<Decimal>) -> Result<Decimal> {
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            (a, b) => {
                error!(
                    num1 = ?a,
                    num2 = ?b,
                    "Calculation requested with missing input by a caller that skipped query validation"
                );
                return Err(AppError::invalid_input("Input numbers cannot be null."));
            }
        };
        info!(num1 = %a, num2 = %b, "Starting calculation");

        let sum = a
            .checked_add(b)
            .ok_or_else(|| AppError::invalid_input("Sum of inputs is out of range."))?;

        let percentage = self.provider.fetch_percentage().await?;
        let percentage = Decimal::from_f64(percentage).ok_or_else(|| {
            AppError::Internal(format!("percentage {percentage} is not a finite decimal"))
        })?;

        let result = apply_percentage(sum, percentage)
            .ok_or_else(|| AppError::invalid_input("Result is out of range."))?;

        info!(
            num1 = %a,
            num2 = %b,
            percentage = %percentage,
            result = %result,
            "Calculation completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    /// Provider returning a fixed outcome and counting how often it is asked.
    struct FixedProvider {
        percentage: Option<f64>,
        calls: AtomicU32,
    }

    impl FixedProvider {
        fn returning(percentage: f64) -> Arc<Self> {
            Arc::new(Self {
                percentage: Some(percentage),
                calls: AtomicU32::new(0),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                percentage: None,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl PercentageProvider for FixedProvider {
        async fn fetch_percentage(&self) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.percentage
                .ok_or_else(|| AppError::unavailable(AppError::CircuitOpen))
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_multiplier_rounds_half_up() {
        assert_eq!(multiplier(dec("10")), dec("1.1"));
        assert_eq!(multiplier(dec("12.345")), dec("1.1235"));
        assert_eq!(multiplier(dec("12.344")), dec("1.1234"));
        assert_eq!(multiplier(dec("0")), Decimal::ONE);
    }

    #[test]
    fn test_apply_percentage_normalizes_scale() {
        let result = apply_percentage(dec("15.00"), dec("10")).unwrap();
        assert_eq!(result.to_string(), "16.5");
    }

    #[test]
    fn test_apply_percentage_overflow_is_none() {
        assert!(apply_percentage(Decimal::MAX, dec("50")).is_none());
    }

    #[tokio::test]
    async fn test_calculate_applies_percentage() {
        let provider = FixedProvider::returning(10.0);
        let engine = CalculationEngine::new(provider.clone());

        let result = assert_ok!(engine.calculate(Some(dec("5")), Some(dec("5"))).await);
        assert_eq!(result, dec("11"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_calculate_propagates_provider_error_unchanged() {
        let engine = CalculationEngine::new(FixedProvider::unavailable());

        let err = assert_err!(engine.calculate(Some(dec("1")), Some(dec("2"))).await);
        assert!(matches!(err, AppError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_calculate_rejects_non_finite_percentage() {
        let engine = CalculationEngine::new(FixedProvider::returning(f64::NAN));

        let err = assert_err!(engine.calculate(Some(dec("1")), Some(dec("2"))).await);
        assert!(matches!(err, AppError::Internal(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // With p given in hundredths, p / 100 is exact at four digits, so the
        // expected value can be built in integer arithmetic.
        #[test]
        fn prop_result_matches_formula(
            a_cents in 0i64..1_000_000_000,
            b_cents in 0i64..1_000_000_000,
            p_hundredths in 0i64..50_000
        ) {
            let a = Decimal::new(a_cents, 2);
            let b = Decimal::new(b_cents, 2);
            let p = Decimal::new(p_hundredths, 2);

            let expected = Decimal::from_i128_with_scale(
                (a_cents + b_cents) as i128 * (10_000 + p_hundredths) as i128,
                6,
            );

            let provider = FixedProvider::returning(p.to_string().parse::<f64>().unwrap());
            let engine = CalculationEngine::new(provider);
            let result = tokio_test::block_on(engine.calculate(Some(a), Some(b))).unwrap();

            prop_assert_eq!(result, expected);
        }

        // A missing input is rejected before the provider is consulted.
        #[test]
        fn prop_missing_input_never_contacts_provider(
            value in proptest::option::of(0i64..1_000_000),
            missing_first in any::<bool>()
        ) {
            let present = value.map(|v| Decimal::new(v, 2));
            let (a, b) = if missing_first { (None, present) } else { (present, None) };

            let provider = FixedProvider::returning(10.0);
            let engine = CalculationEngine::new(provider.clone());
            let result = tokio_test::block_on(engine.calculate(a, b));

            let rejected = matches!(result, Err(AppError::InvalidInput { .. }));
            prop_assert!(rejected, "expected InvalidInput, got {:?}", result);
            prop_assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        }
    }
}

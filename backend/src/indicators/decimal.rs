// =============================================================================
// Fixed-point helpers shared by the indicator functions
// =============================================================================
//
// Price-denominated values (and ratios such as volatility) are kept at 8
// fractional digits, percentage-denominated values (RSI, momentum, volume
// ratio, pump score) at 2. Both round half-up, i.e. midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const PRICE_SCALE: u32 = 8;
pub const PERCENT_SCALE: u32 = 2;

/// Convergence threshold for [`sqrt`].
const SQRT_EPSILON: Decimal = dec!(0.00000001);
const SQRT_MAX_ITERATIONS: usize = 100;

pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(values: &[Decimal]) -> Option<Decimal> {
    let avg = mean(values)?;
    let variance = values
        .iter()
        .map(|v| (*v - avg) * (*v - avg))
        .sum::<Decimal>()
        / Decimal::from(values.len());
    sqrt(variance)
}

/// Square root by Newton's method: `x' = (x + v / x) / 2` until two successive
/// estimates differ by less than 1e-8.
///
/// Returns `None` for negative input.
pub fn sqrt(value: Decimal) -> Option<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    if value.is_zero() {
        return Some(Decimal::ZERO);
    }

    let mut x = if value > Decimal::ONE { value / dec!(2) } else { Decimal::ONE };
    for _ in 0..SQRT_MAX_ITERATIONS {
        let next = (x + value / x) / dec!(2);
        if (next - x).abs() < SQRT_EPSILON {
            return Some(next);
        }
        x = next;
    }
    Some(x)
}

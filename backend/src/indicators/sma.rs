// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA = (p[n-period] + ... + p[n-1]) / period
//
// Only the trailing window matters; older prices are ignored.

use rust_decimal::Decimal;

use super::decimal::{mean, round_price};

/// Mean of the last `period` prices, rounded to price scale.
///
/// Returns `None` when `period == 0` or fewer than `period` prices exist.
pub fn sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }
    mean(&prices[prices.len() - period..]).map(round_price)
}

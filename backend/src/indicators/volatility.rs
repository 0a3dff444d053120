// =============================================================================
// Realized volatility
// =============================================================================
//
//   r[i]       = (p[i] - p[i-1]) / p[i-1]
//   volatility = population σ of the trailing `period` returns
//
// Expressed as a plain ratio (0.05 = 5 %), so it keeps price scale.

use rust_decimal::Decimal;

use super::decimal::{population_std_dev, round_price};

/// Standard deviation of the last `period` simple returns.
///
/// Returns `None` when `period == 0`, fewer than `period + 1` prices exist, or
/// a zero price sits in the denominator of any return in the window.
pub fn volatility(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let returns = window
        .windows(2)
        .map(|w| {
            if w[0].is_zero() {
                None
            } else {
                Some((w[1] - w[0]) / w[0])
            }
        })
        .collect::<Option<Vec<Decimal>>>()?;

    population_std_dev(&returns).map(round_price)
}

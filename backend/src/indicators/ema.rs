// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
//   k      = 2 / (period + 1)
//   ema[i] = p[i] * k + ema[i-1] * (1 - k)
//
// Seeded with the SMA of the first `period` prices. Intermediate values stay
// unrounded so MACD can reuse the series without compounding rounding error.
// =============================================================================

use rust_decimal::Decimal;

use super::decimal::round_price;

/// Compute the EMA series for the given `prices` slice and look-back `period`.
///
/// Empty when `period == 0` or fewer than `period` prices exist.
/// Element `j` of the output corresponds to the price at index `period - 1 + j`.
pub fn calculate_ema(prices: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || prices.len() < period {
        return Vec::new();
    }

    let multiplier = Decimal::TWO / Decimal::from(period + 1);
    let keep = Decimal::ONE - multiplier;

    let seed = prices[..period].iter().copied().sum::<Decimal>() / Decimal::from(period);

    let mut result = Vec::with_capacity(prices.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &price in &prices[period..] {
        let ema = price * multiplier + prev * keep;
        result.push(ema);
        prev = ema;
    }

    result
}

/// Latest EMA value, rounded to price scale. `None` on insufficient data.
pub fn ema(prices: &[Decimal], period: usize) -> Option<Decimal> {
    calculate_ema(prices, period).last().copied().map(round_price)
}

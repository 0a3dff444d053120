// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD   = EMA12 - EMA26
//   Signal = EMA9 of the MACD series
//
// The MACD series used for the signal line starts at index 26 (the 27th
// price). Because the EMA recurrence only looks backwards, the EMA of a
// prefix ending at index i equals element i of the full EMA series, so the
// series is read straight off the two EMA vectors instead of recomputing
// every prefix.

use rust_decimal::Decimal;

use super::decimal::round_price;
use super::ema::calculate_ema;

pub const FAST_PERIOD: usize = 12;
pub const SLOW_PERIOD: usize = 26;
pub const SIGNAL_PERIOD: usize = 9;

/// Index of the first price that contributes a value to the MACD series.
const SERIES_START: usize = SLOW_PERIOD;

/// Latest MACD line value. Requires at least 26 prices.
pub fn macd(prices: &[Decimal]) -> Option<Decimal> {
    let fast = calculate_ema(prices, FAST_PERIOD);
    let slow = calculate_ema(prices, SLOW_PERIOD);
    Some(round_price(*fast.last()? - *slow.last()?))
}

/// Unrounded MACD values for price indices `26..prices.len()`.
pub fn macd_series(prices: &[Decimal]) -> Vec<Decimal> {
    if prices.len() <= SERIES_START {
        return Vec::new();
    }

    let fast = calculate_ema(prices, FAST_PERIOD);
    let slow = calculate_ema(prices, SLOW_PERIOD);

    // fast[j] belongs to price index j + 11, slow[j] to j + 25.
    (SERIES_START..prices.len())
        .map(|i| fast[i + 1 - FAST_PERIOD] - slow[i + 1 - SLOW_PERIOD])
        .collect()
}

/// Signal line: EMA9 of [`macd_series`]. Requires at least 35 prices.
pub fn macd_signal(prices: &[Decimal]) -> Option<Decimal> {
    calculate_ema(&macd_series(prices), SIGNAL_PERIOD)
        .last()
        .copied()
        .map(round_price)
}

// =============================================================================
// Relative Strength Index (RSI): simple-average variant
// =============================================================================
//
// 1. Take the last `period` price changes (deltas).
// 2. Split them into gains and losses (losses as positive magnitudes).
// 3. Average each with a plain SMA over `period`.
// 4. RS  = avg_gain / avg_loss
//    RSI = 100 - 100 / (1 + RS)
//
// When avg_loss is zero RSI is pinned to 100 instead of dividing by zero.
// A perfectly flat window therefore reads 100 as well.
//
// Thresholds used by the scorer: RSI < 30 oversold, RSI > 70 overbought.
// =============================================================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::decimal::round_percent;

/// RSI over the trailing `period` deltas, rounded to percent scale.
///
/// # Edge cases
/// - `period == 0` => `None`
/// - `prices.len() < period + 1` => `None` (need `period` deltas)
/// - zero average loss => exactly 100
pub fn rsi(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let (sum_gain, sum_loss) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(g, l), d| {
            if d > Decimal::ZERO {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let period_d = Decimal::from(period);
    let avg_gain = sum_gain / period_d;
    let avg_loss = sum_loss / period_d;

    Some(round_percent(rsi_from_averages(avg_gain, avg_loss)))
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
    if avg_loss.is_zero() {
        return dec!(100);
    }
    let rs = avg_gain / avg_loss;
    dec!(100) - dec!(100) / (Decimal::ONE + rs)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Decimal> {
        values
            .iter()
            .map(|v| Decimal::try_from(*v).unwrap())
            .collect()
    }

    #[test]
    fn rsi_empty_input() {
        assert!(rsi(&[], 14).is_none());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(rsi(&series(&[1.0, 2.0, 3.0]), 0).is_none());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 prices => 13 deltas < 14.
        let prices: Vec<Decimal> = (1..=14).map(Decimal::from).collect();
        assert!(rsi(&prices, 14).is_none());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<Decimal> = (1..=30).map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), Some(dec!(100)));
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<Decimal> = (1..=30).rev().map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), Some(dec!(0)));
    }

    #[test]
    fn rsi_flat_market_is_100() {
        // No losses at all: the zero-loss rule applies.
        let prices = vec![dec!(100); 30];
        assert_eq!(rsi(&prices, 14), Some(dec!(100)));
    }

    #[test]
    fn rsi_only_uses_trailing_window() {
        // A crash far outside the window must not matter.
        let mut prices = vec![dec!(500), dec!(1)];
        prices.extend((1..=15).map(Decimal::from));
        assert_eq!(rsi(&prices, 14), Some(dec!(100)));
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        // Alternate +1 / -1: equal average gain and loss.
        let prices: Vec<Decimal> = (0..15)
            .map(|i| if i % 2 == 0 { dec!(10) } else { dec!(11) })
            .collect();
        assert_eq!(rsi(&prices, 14), Some(dec!(50)));
    }

    #[test]
    fn rsi_range_check() {
        let prices = series(&[
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ]);
        let value = rsi(&prices, 14).unwrap();
        assert!(value >= dec!(0) && value <= dec!(100), "RSI {value} out of range");
        assert!(value < dec!(100));
    }
}

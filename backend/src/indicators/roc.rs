// =============================================================================
// Momentum (rate of change, percent)
// =============================================================================
//
//   momentum = 100 * (p[last] - p[last - period]) / p[last - period]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::decimal::round_percent;

/// Calculate the Rate of Change for every price from index `period` onward.
///
/// A zero base price makes that element undefined (`None`).
pub fn calculate_roc(prices: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    if period == 0 || prices.len() <= period {
        return Vec::new();
    }

    (period..prices.len())
        .map(|i| {
            let base = prices[i - period];
            if base.is_zero() {
                None
            } else {
                Some((prices[i] - base) / base * dec!(100))
            }
        })
        .collect()
}

/// Latest momentum reading, rounded to percent scale.
pub fn momentum(prices: &[Decimal], period: usize) -> Option<Decimal> {
    calculate_roc(prices, period).last().copied().flatten().map(round_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_spans_the_whole_period() {
        let prices: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        let roc = calculate_roc(&prices, 14);
        assert_eq!(roc.len(), 6);
        // 1 -> 15 is +1400 %
        assert_eq!(roc[0], Some(dec!(1400)));
    }

    #[test]
    fn needs_period_plus_one_prices() {
        let prices = vec![dec!(1), dec!(2), dec!(3)];
        assert!(calculate_roc(&prices, 14).is_empty());
        assert!(momentum(&prices, 3).is_none());
    }

    #[test]
    fn momentum_flat_is_zero() {
        let prices = vec![dec!(100); 30];
        assert_eq!(momentum(&prices, 10), Some(dec!(0)));
    }

    #[test]
    fn momentum_negative_and_rounded() {
        // 300 -> 200 over 10 steps: -33.333... => -33.33
        let mut prices = vec![dec!(300)];
        prices.extend(std::iter::repeat(dec!(250)).take(9));
        prices.push(dec!(200));
        assert_eq!(momentum(&prices, 10), Some(dec!(-33.33)));
    }

    #[test]
    fn momentum_zero_base_is_undefined() {
        let mut prices = vec![dec!(0)];
        prices.extend(std::iter::repeat(dec!(5)).take(10));
        assert!(momentum(&prices, 10).is_none());
    }
}

// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ). σ is the population standard deviation over
// the same trailing window as the SMA.
//
// The scorer reads the price's relative position inside the bands:
//   position = (price - lower) / (upper - lower)
// 0 sits on the lower band, 1 on the upper band.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::decimal::{mean, population_std_dev, round_price};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_NUM_STD: Decimal = dec!(2);

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

impl BollingerBands {
    /// Relative position of `price` inside the bands.
    ///
    /// Collapsed bands (upper == lower) have no meaningful range; the price is
    /// then reported at the neutral midpoint 0.5. Prices outside the bands
    /// yield values below 0 or above 1.
    pub fn position(&self, price: Decimal) -> Decimal {
        let range = self.upper - self.lower;
        if range.is_zero() {
            return dec!(0.5);
        }
        (price - self.lower) / range
    }
}

/// Calculate Bollinger Bands for the given prices.
///
/// Returns `None` when `period == 0` or fewer than `period` prices exist.
pub fn calculate_bollinger(prices: &[Decimal], period: usize, num_std: Decimal) -> Option<BollingerBands> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = mean(window)?;
    let std_dev = population_std_dev(window)?;

    Some(BollingerBands {
        upper: round_price(middle + num_std * std_dev),
        middle: round_price(middle),
        lower: round_price(middle - num_std * std_dev),
    })
}

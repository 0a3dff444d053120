// =============================================================================
// Volume ratio
// =============================================================================
//
//   ratio = current volume / mean volume of the trailing window
//
// The window includes the current candle. A zero mean has no sensible ratio
// and is rejected outright rather than mapped to a placeholder.

use rust_decimal::Decimal;

use super::decimal::{mean, round_percent};
use crate::error::AnalysisError;

/// Volume ratio over the last `period` volumes.
///
/// `Ok(None)` on insufficient data, `Err(DivideByZero)` when every volume in
/// the window is zero.
pub fn volume_ratio(volumes: &[Decimal], period: usize) -> Result<Option<Decimal>, AnalysisError> {
    if period == 0 || volumes.len() < period {
        return Ok(None);
    }

    let window = &volumes[volumes.len() - period..];
    let avg = match mean(window) {
        Some(avg) => avg,
        None => return Ok(None),
    };
    if avg.is_zero() {
        return Err(AnalysisError::DivideByZero("volume ratio"));
    }

    let current = window[window.len() - 1];
    Ok(Some(round_percent(current / avg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn uniform_volume_is_one() {
        let volumes = vec![dec!(5); 20];
        assert_eq!(volume_ratio(&volumes, 20).unwrap(), Some(dec!(1)));
    }

    #[test]
    fn spike_is_detected() {
        // 19 x 1 then 21: mean = 40 / 20 = 2, ratio = 10.5
        let mut volumes = vec![dec!(1); 19];
        volumes.push(dec!(21));
        assert_eq!(volume_ratio(&volumes, 20).unwrap(), Some(dec!(10.5)));
    }

    #[test]
    fn insufficient_data_is_none() {
        let volumes = vec![dec!(1); 5];
        assert_eq!(volume_ratio(&volumes, 20).unwrap(), None);
    }

    #[test]
    fn zero_mean_is_rejected() {
        let volumes = vec![Decimal::ZERO; 20];
        assert!(matches!(
            volume_ratio(&volumes, 20),
            Err(AnalysisError::DivideByZero("volume ratio"))
        ));
    }
}

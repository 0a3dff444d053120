// =============================================================================
// Indicator snapshot for one price series
// =============================================================================
//
// `IndicatorSet` is the wire-facing value: every field is either a number or
// `null` when the series was too short for it. `CompleteIndicators` is the
// same set with every field present; the scorer only accepts the complete
// form, so a missing indicator can never be scored as if it were zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bollinger::{calculate_bollinger, DEFAULT_NUM_STD, DEFAULT_PERIOD};
use super::ema::ema;
use super::macd::{macd, macd_signal, FAST_PERIOD, SLOW_PERIOD};
use super::rsi::rsi;
use super::sma::sma;
use super::volatility::volatility;
use super::volume::volume_ratio;
use super::roc::momentum;
use crate::error::AnalysisError;
use crate::market_data::PriceSeries;

pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_PERIOD: usize = 20;
pub const MOMENTUM_PERIOD: usize = 10;
pub const VOLUME_PERIOD: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSet {
    pub sma20: Option<Decimal>,
    pub sma50: Option<Decimal>,
    pub ema12: Option<Decimal>,
    pub ema26: Option<Decimal>,
    pub rsi14: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub bb_upper: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub volatility: Option<Decimal>,
    pub momentum: Option<Decimal>,
    pub volume_ratio: Option<Decimal>,
}

/// Every indicator present; the only input the scorer accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteIndicators {
    pub sma20: Decimal,
    pub sma50: Decimal,
    pub ema12: Decimal,
    pub ema26: Decimal,
    pub rsi14: Decimal,
    pub macd: Decimal,
    pub macd_signal: Decimal,
    pub bb_upper: Decimal,
    pub bb_middle: Decimal,
    pub bb_lower: Decimal,
    pub volatility: Decimal,
    pub momentum: Decimal,
    pub volume_ratio: Decimal,
}

impl IndicatorSet {
    /// Compute the full indicator battery for `series`.
    ///
    /// Short series yield `None` fields; only a zero mean volume is an error.
    pub fn compute(series: &PriceSeries) -> Result<Self, AnalysisError> {
        let prices = series.prices();
        let volumes = series.volumes();
        let bands = calculate_bollinger(&prices, DEFAULT_PERIOD, DEFAULT_NUM_STD);

        Ok(Self {
            sma20: sma(&prices, SMA_SHORT),
            sma50: sma(&prices, SMA_LONG),
            ema12: ema(&prices, FAST_PERIOD),
            ema26: ema(&prices, SLOW_PERIOD),
            rsi14: rsi(&prices, RSI_PERIOD),
            macd: macd(&prices),
            macd_signal: macd_signal(&prices),
            bb_upper: bands.map(|b| b.upper),
            bb_middle: bands.map(|b| b.middle),
            bb_lower: bands.map(|b| b.lower),
            volatility: volatility(&prices, VOLATILITY_PERIOD),
            momentum: momentum(&prices, MOMENTUM_PERIOD),
            volume_ratio: volume_ratio(&volumes, VOLUME_PERIOD)?,
        })
    }

    /// Names of the indicators that could not be computed, in field order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("sma20", self.sma20),
            ("sma50", self.sma50),
            ("ema12", self.ema12),
            ("ema26", self.ema26),
            ("rsi14", self.rsi14),
            ("macd", self.macd),
            ("macdSignal", self.macd_signal),
            ("bbUpper", self.bb_upper),
            ("bbMiddle", self.bb_middle),
            ("bbLower", self.bb_lower),
            ("volatility", self.volatility),
            ("momentum", self.momentum),
            ("volumeRatio", self.volume_ratio),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Convert into the complete form, or report the first missing indicator.
    pub fn require_complete(&self, available: usize) -> Result<CompleteIndicators, AnalysisError> {
        let missing = |indicator| AnalysisError::InsufficientHistory { indicator, available };
        Ok(CompleteIndicators {
            sma20: self.sma20.ok_or_else(|| missing("sma20"))?,
            sma50: self.sma50.ok_or_else(|| missing("sma50"))?,
            ema12: self.ema12.ok_or_else(|| missing("ema12"))?,
            ema26: self.ema26.ok_or_else(|| missing("ema26"))?,
            rsi14: self.rsi14.ok_or_else(|| missing("rsi14"))?,
            macd: self.macd.ok_or_else(|| missing("macd"))?,
            macd_signal: self.macd_signal.ok_or_else(|| missing("macdSignal"))?,
            bb_upper: self.bb_upper.ok_or_else(|| missing("bbUpper"))?,
            bb_middle: self.bb_middle.ok_or_else(|| missing("bbMiddle"))?,
            bb_lower: self.bb_lower.ok_or_else(|| missing("bbLower"))?,
            volatility: self.volatility.ok_or_else(|| missing("volatility"))?,
            momentum: self.momentum.ok_or_else(|| missing("momentum"))?,
            volume_ratio: self.volume_ratio.ok_or_else(|| missing("volumeRatio"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PricePoint;
    use rust_decimal_macros::dec;

    fn flat_series(n: usize) -> PriceSeries {
        PriceSeries::from_unordered(
            (0..n)
                .map(|i| PricePoint::new(i as i64 * 60_000, dec!(100), dec!(10)))
                .collect(),
        )
    }

    #[test]
    fn flat_thirty_points() {
        let set = IndicatorSet::compute(&flat_series(30)).unwrap();
        assert_eq!(set.momentum, Some(dec!(0)));
        assert_eq!(set.volatility, Some(dec!(0)));
        assert_eq!(set.rsi14, Some(dec!(100)));
        assert_eq!(set.macd, Some(dec!(0)));
        // Too short for SMA50 and for the signal line.
        assert!(set.sma50.is_none());
        assert!(set.macd_signal.is_none());
        assert_eq!(set.missing(), vec!["sma50", "macdSignal"]);
    }

    #[test]
    fn short_series_yields_only_sentinels() {
        let set = IndicatorSet::compute(&flat_series(5)).unwrap();
        assert!(set.sma20.is_none());
        assert!(set.ema12.is_none());
        assert!(set.rsi14.is_none());
        assert!(set.bb_middle.is_none());
        assert_eq!(set.missing().len(), 13);
    }

    #[test]
    fn require_complete_reports_first_missing() {
        let set = IndicatorSet::compute(&flat_series(30)).unwrap();
        match set.require_complete(30) {
            Err(AnalysisError::InsufficientHistory { indicator, available }) => {
                assert_eq!(indicator, "sma50");
                assert_eq!(available, 30);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn long_series_is_complete() {
        let set = IndicatorSet::compute(&flat_series(60)).unwrap();
        assert!(set.missing().is_empty());
        let complete = set.require_complete(60).unwrap();
        assert_eq!(complete.sma50, dec!(100));
        assert_eq!(complete.bb_upper, dec!(100));
    }

    #[test]
    fn zero_volume_window_is_an_error() {
        let series = PriceSeries::from_unordered(
            (0..60)
                .map(|i| PricePoint::new(i, dec!(100), Decimal::ZERO))
                .collect(),
        );
        assert!(matches!(
            IndicatorSet::compute(&series),
            Err(AnalysisError::DivideByZero(_))
        ));
    }

    #[test]
    fn serialises_camel_case_with_nulls() {
        let set = IndicatorSet::compute(&flat_series(30)).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.get("macdSignal").unwrap().is_null());
        assert!(json.get("volumeRatio").unwrap().is_number());
        assert!(json.get("bbUpper").is_some());
    }
}

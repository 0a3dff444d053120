// =============================================================================
// Pump Scorer: additive heuristic over the indicator battery
// =============================================================================
//
// Start from a neutral 50, apply every rule below at most once, clamp to
// [0, 100]:
//
//   RSI < 30                              +20
//   30 <= RSI < 40                        +10
//   RSI > 70                              -10
//   MACD > signal and MACD > 0            +15
//   MACD < signal                         -10
//   band position <= 0.2                  +15   (below the band counts)
//   band position >= 0.8                  -10
//   volume ratio > 1.5                    +10
//   volume ratio < 0.5                     -5
//   momentum > 0                          +10   (else -5)
//   price > SMA20 > SMA50                 +10
//   price < SMA20 < SMA50                 -10
//   0.02 < volatility < 0.10               +5
//   volatility > 0.15                      -5
//
// This is a heuristic, not a trained model.
// =============================================================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::indicators::bollinger::BollingerBands;
use crate::indicators::decimal::round_percent;
use crate::indicators::CompleteIndicators;
use crate::types::{RiskLevel, SignalKind, Trend};

pub const NEUTRAL_SCORE: Decimal = dec!(50);
pub const MIN_SCORE: Decimal = dec!(0);
pub const MAX_SCORE: Decimal = dec!(100);

/// One rule that fired and what it added to the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreAdjustment {
    pub rule: &'static str,
    pub delta: Decimal,
}

/// Outcome of scoring one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpAssessment {
    pub score: Decimal,
    pub trend: Trend,
    pub risk_level: RiskLevel,
    pub signals: Vec<SignalKind>,
    pub adjustments: Vec<ScoreAdjustment>,
}

/// Deterministic pump-likelihood scorer.
#[derive(Debug, Clone, Default)]
pub struct PumpScorer;

impl PumpScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score `price` against a complete indicator set.
    pub fn assess(&self, price: Decimal, ind: &CompleteIndicators) -> PumpAssessment {
        let adjustments = self.adjustments(price, ind);
        let raw = adjustments
            .iter()
            .fold(NEUTRAL_SCORE, |acc, adj| acc + adj.delta);
        let score = round_percent(raw.clamp(MIN_SCORE, MAX_SCORE));

        PumpAssessment {
            score,
            trend: classify_trend(price, ind.sma20, ind.sma50),
            risk_level: classify_risk(score),
            signals: detect_signals(ind),
            adjustments,
        }
    }

    /// Every rule that fires for this input, in table order.
    pub fn adjustments(&self, price: Decimal, ind: &CompleteIndicators) -> Vec<ScoreAdjustment> {
        let mut out = Vec::new();
        let mut push = |rule: &'static str, delta: Decimal| out.push(ScoreAdjustment { rule, delta });

        // RSI
        if ind.rsi14 < dec!(30) {
            push("rsi_oversold", dec!(20));
        } else if ind.rsi14 < dec!(40) {
            push("rsi_weak", dec!(10));
        } else if ind.rsi14 > dec!(70) {
            push("rsi_overbought", dec!(-10));
        }

        // MACD
        if ind.macd > ind.macd_signal && ind.macd > Decimal::ZERO {
            push("macd_bullish", dec!(15));
        } else if ind.macd < ind.macd_signal {
            push("macd_bearish", dec!(-10));
        }

        // Bollinger position
        let bands = BollingerBands {
            upper: ind.bb_upper,
            middle: ind.bb_middle,
            lower: ind.bb_lower,
        };
        let position = bands.position(price);
        if position <= dec!(0.2) {
            push("near_lower_band", dec!(15));
        } else if position >= dec!(0.8) {
            push("near_upper_band", dec!(-10));
        }

        // Volume
        if ind.volume_ratio > dec!(1.5) {
            push("volume_surge", dec!(10));
        } else if ind.volume_ratio < dec!(0.5) {
            push("volume_dry", dec!(-5));
        }

        // Momentum
        if ind.momentum > Decimal::ZERO {
            push("momentum_up", dec!(10));
        } else {
            push("momentum_flat_or_down", dec!(-5));
        }

        // Moving-average stack
        match classify_trend(price, ind.sma20, ind.sma50) {
            Trend::Bullish => push("ma_stack_up", dec!(10)),
            Trend::Bearish => push("ma_stack_down", dec!(-10)),
            Trend::Sideways => {}
        }

        // Volatility
        if ind.volatility > dec!(0.02) && ind.volatility < dec!(0.10) {
            push("volatility_healthy", dec!(5));
        } else if ind.volatility > dec!(0.15) {
            push("volatility_extreme", dec!(-5));
        }

        out
    }
}

/// `price > sma20 > sma50` is bullish, `price < sma20 < sma50` bearish,
/// anything else sideways.
pub fn classify_trend(price: Decimal, sma20: Decimal, sma50: Decimal) -> Trend {
    if price > sma20 && sma20 > sma50 {
        Trend::Bullish
    } else if price < sma20 && sma20 < sma50 {
        Trend::Bearish
    } else {
        Trend::Sideways
    }
}

/// Risk from score alone. Higher score means *lower* risk label.
pub fn classify_risk(score: Decimal) -> RiskLevel {
    if score > dec!(80) {
        RiskLevel::Low
    } else if score > dec!(60) {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Discrete signals, always in [`SignalKind`] declaration order.
pub fn detect_signals(ind: &CompleteIndicators) -> Vec<SignalKind> {
    let mut signals = Vec::new();
    if ind.rsi14 < dec!(30) {
        signals.push(SignalKind::RsiOversold);
    }
    if ind.macd > ind.macd_signal {
        signals.push(SignalKind::MacdBullishCross);
    }
    if ind.volume_ratio > dec!(1.5) {
        signals.push(SignalKind::HighVolume);
    }
    if ind.momentum > Decimal::ZERO {
        signals.push(SignalKind::PositiveMomentum);
    }
    signals
}

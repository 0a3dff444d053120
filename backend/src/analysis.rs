// =============================================================================
// Per-symbol analysis pass
// =============================================================================
//
// PriceSeries -> IndicatorSet -> PumpAssessment -> AnalysisResult.
//
// The pass refuses to score when any indicator is missing; a symbol with
// short history produces an `InsufficientHistory` error, never a result
// scored against placeholder values.
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, DataError};
use crate::indicators::decimal::round_price;
use crate::indicators::IndicatorSet;
use crate::market_data::PriceSeries;
use crate::signals::PumpScorer;
use crate::types::{RiskLevel, SignalKind, Trend};

/// Outcome of analysing one symbol. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub symbol: String,
    pub current_price: Decimal,
    pub indicator_set: IndicatorSet,
    pub pump_score: Decimal,
    pub trend: Trend,
    pub risk_level: RiskLevel,
    pub signals: Vec<SignalKind>,
    pub computed_at: DateTime<Utc>,
}

/// Run the indicator battery and the scorer over `series`.
///
/// `current_price` comes from the ticker snapshot and may be newer than the
/// last candle close.
pub fn analyze_series(
    symbol: &str,
    current_price: Decimal,
    series: &PriceSeries,
    scorer: &PumpScorer,
    computed_at: DateTime<Utc>,
) -> Result<AnalysisResult, AnalysisError> {
    if series.is_empty() {
        return Err(DataError::Empty(format!("candles for {symbol}")).into());
    }

    let indicator_set = IndicatorSet::compute(series)?;
    let missing = indicator_set.missing();
    if !missing.is_empty() {
        debug!(symbol, points = series.len(), ?missing, "indicators incomplete, not scoring");
    }
    let complete = indicator_set.require_complete(series.len())?;
    let assessment = scorer.assess(current_price, &complete);

    debug!(
        symbol,
        score = %assessment.score,
        trend = %assessment.trend,
        fired = assessment.adjustments.len(),
        "symbol scored"
    );

    Ok(AnalysisResult {
        symbol: symbol.to_string(),
        current_price: round_price(current_price),
        indicator_set,
        pump_score: assessment.score,
        trend: assessment.trend,
        risk_level: assessment.risk_level,
        signals: assessment.signals,
        computed_at,
    })
}

// =============================================================================
// Persistence edge: flat row for a relational store
// =============================================================================
//
// Signals are stored as ONE text column joined with `,`. Labels never contain
// a comma, an empty list is the empty string, and parsing drops empty fields,
// so `""`, `","` and `"RSI Oversold,"` all read back cleanly.
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::AnalysisResult;
use crate::indicators::decimal::{round_percent, round_price};
use crate::types::SignalKind;

pub const SIGNAL_DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub symbol: String,
    /// Scale 8.
    pub current_price: Decimal,
    /// Scale 2.
    pub pump_score: Decimal,
    pub trend: String,
    pub risk_level: String,
    pub signals: String,
    pub last_updated: DateTime<Utc>,
}

impl From<&AnalysisResult> for AnalysisRecord {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            symbol: result.symbol.clone(),
            current_price: round_price(result.current_price),
            pump_score: round_percent(result.pump_score),
            trend: result.trend.to_string(),
            risk_level: result.risk_level.to_string(),
            signals: join_signals(&result.signals),
            last_updated: result.computed_at,
        }
    }
}

impl AnalysisRecord {
    /// Stored signal column back as the enumerated list. Unknown labels are
    /// logged and dropped.
    pub fn signal_kinds(&self) -> Vec<SignalKind> {
        split_signals(&self.signals)
            .filter_map(|label| match label.parse::<SignalKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!(symbol = %self.symbol, label, error = %e, "unknown stored signal");
                    None
                }
            })
            .collect()
    }
}

pub fn join_signals(signals: &[SignalKind]) -> String {
    signals
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(&SIGNAL_DELIMITER.to_string())
}

fn split_signals(column: &str) -> impl Iterator<Item = &str> {
    column
        .split(SIGNAL_DELIMITER)
        .map(str::trim)
        .filter(|field| !field.is_empty())
}

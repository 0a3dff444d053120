// =============================================================================
// Shared labels used across the Alt Radar analysis engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Direction of the moving-average stack relative to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH"),
            Self::Bearish => write!(f, "BEARISH"),
            Self::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

impl std::str::FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BULLISH" => Ok(Self::Bullish),
            "BEARISH" => Ok(Self::Bearish),
            "SIDEWAYS" => Ok(Self::Sideways),
            other => Err(format!("unknown trend '{other}'")),
        }
    }
}

/// Risk bucket derived from the pump score.
///
/// The polarity is inverted relative to everyday usage: `Low` means the
/// bullish reading is strong (score above 80), `High` means it is weak.
/// Dashboards and stored rows depend on this meaning, so it must not be
/// flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// A discrete, human-readable condition attached to an analysis result.
///
/// Variants are declared in evaluation order; results always list them in
/// this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "RSI Oversold")]
    RsiOversold,
    #[serde(rename = "MACD Bullish Cross")]
    MacdBullishCross,
    #[serde(rename = "High Volume")]
    HighVolume,
    #[serde(rename = "Positive Momentum")]
    PositiveMomentum,
}

impl SignalKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::RsiOversold => "RSI Oversold",
            Self::MacdBullishCross => "MACD Bullish Cross",
            Self::HighVolume => "High Volume",
            Self::PositiveMomentum => "Positive Momentum",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RSI Oversold" => Ok(Self::RsiOversold),
            "MACD Bullish Cross" => Ok(Self::MacdBullishCross),
            "High Volume" => Ok(Self::HighVolume),
            "Positive Momentum" => Ok(Self::PositiveMomentum),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators behind the pump
// score. Everything works on `rust_decimal::Decimal`. Every public function
// returns `Option<T>` so callers are forced to handle insufficient-data and
// undefined-denominator cases instead of reading a placeholder zero.

pub mod bollinger;
pub mod decimal;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod set;
pub mod sma;
pub mod volatility;
pub mod volume;

pub use set::{CompleteIndicators, IndicatorSet};

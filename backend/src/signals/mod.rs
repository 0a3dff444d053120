// =============================================================================
// Signals Module
// =============================================================================
//
// Turns a complete indicator set into a pump score, trend, risk label and
// the list of discrete signals that fired.

pub mod pump_score;

pub use pump_score::PumpScorer;

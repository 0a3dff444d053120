// =============================================================================
// Error taxonomy
// =============================================================================
//
// Three layers:
//   DataError      a single call to the quote provider went wrong.
//   AnalysisError  one symbol could not be analysed; the pipeline skips it.
//   PipelineError  the whole run failed; only raised when the provider could
//                 not be reached at all.
// =============================================================================

use thiserror::Error;

/// Failure of one outbound call to the market data provider.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("empty payload: {0}")]
    Empty(String),
}

impl DataError {
    /// Transport failures, throttling (429) and server errors (5xx) are worth
    /// retrying; everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) | Self::Empty(_) => false,
        }
    }
}

/// Reason a single symbol produced no [`crate::analysis::AnalysisResult`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] DataError),

    #[error("insufficient history for {indicator} ({available} points)")]
    InsufficientHistory {
        indicator: &'static str,
        available: usize,
    },

    #[error("division by zero computing {0}")]
    DivideByZero(&'static str),
}

/// Run-level failure surfaced to the caller of `run_analysis`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("market data provider unreachable: {failures} call(s) failed and none succeeded")]
    ProviderUnreachable { failures: usize },
}

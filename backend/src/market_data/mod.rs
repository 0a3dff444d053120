// =============================================================================
// Market data: provider seam and series types
// =============================================================================

pub mod series;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub use series::{PricePoint, PriceSeries};

/// Latest trade snapshot for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub current_price: Decimal,
    /// Accumulated traded volume over the provider's 24 h window, when given.
    pub volume_24h: Option<Decimal>,
    pub timestamp: Option<i64>,
}

/// Source of ticker snapshots and candle history.
///
/// Implementations perform exactly one outbound request per call; pacing and
/// retries are the caller's job (see `pipeline::CollectionPipeline`).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// One batched ticker lookup for all `symbols`.
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, DataError>;

    /// Up to `count` most recent candles for `symbol`, in whatever order the
    /// provider returns them.
    async fn fetch_candles(&self, symbol: &str, count: u32) -> Result<Vec<PricePoint>, DataError>;

    /// Every market symbol the provider lists.
    async fn list_markets(&self) -> Result<Vec<String>, DataError>;
}

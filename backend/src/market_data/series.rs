use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One closed candle reduced to what the indicators need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Candle timestamp, epoch milliseconds.
    pub timestamp: i64,
    pub price: Decimal,
    pub volume: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: Decimal, volume: Decimal) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

// ---------------------------------------------------------------------------
// PriceSeries -- immutable, oldest-first
// ---------------------------------------------------------------------------

/// Ordered price history for one market.
///
/// Timestamps are strictly increasing. Providers deliver candles newest-first
/// (Upbit) or oldest-first; construction normalises both to oldest-first and
/// drops duplicate timestamps, keeping the last occurrence received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn from_unordered(mut points: Vec<PricePoint>) -> Self {
        // Stable sort keeps arrival order among equal timestamps, so the
        // reverse-dedup below keeps the last one received.
        points.sort_by_key(|p| p.timestamp);
        points.reverse();
        points.dedup_by_key(|p| p.timestamp);
        points.reverse();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Price projection, oldest-first.
    pub fn prices(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Volume projection, oldest-first.
    pub fn volumes(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.volume).collect()
    }
}

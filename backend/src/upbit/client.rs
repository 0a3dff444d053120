// =============================================================================
// Upbit REST API Client: public quotation endpoints
// =============================================================================
//
// Only unauthenticated quotation endpoints are used, so no request signing is
// involved. Each method performs exactly one HTTP request; pacing through the
// shared `RateLimiter` and retrying are done by the collection pipeline.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::DataError;
use crate::market_data::{MarketDataSource, PricePoint, Ticker};

pub const DEFAULT_BASE_URL: &str = "https://api.upbit.com";

/// Upbit caps `count` on the candle endpoint at 200.
const MAX_CANDLE_COUNT: u32 = 200;

// -----------------------------------------------------------------------------
// Wire formats
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTicker {
    market: String,
    trade_price: Decimal,
    #[serde(default)]
    acc_trade_volume_24h: Option<Decimal>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(default)]
    candle_date_time_utc: Option<String>,
    trade_price: Decimal,
    candle_acc_trade_volume: Decimal,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    market: String,
}

/// Upbit REST client for the quotation API.
#[derive(Clone)]
pub struct UpbitClient {
    base_url: String,
    candle_unit_minutes: u32,
    client: reqwest::Client,
}

impl UpbitClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `UpbitClient`.
    ///
    /// # Arguments
    /// * `base_url`           : API root, e.g. `https://api.upbit.com`.
    /// * `candle_unit_minutes`: minute-candle unit (1, 3, 5, 15, 30, 60, 240).
    /// * `timeout`            : per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        candle_unit_minutes: u32,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, candle_unit_minutes, "UpbitClient initialised");

        Ok(Self {
            base_url,
            candle_unit_minutes,
            client,
        })
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `path` and decode the JSON body into `T`.
    ///
    /// Non-2xx statuses become [`DataError::Status`] (with the body for
    /// diagnostics); undecodable bodies become [`DataError::Malformed`].
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DataError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(DataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| DataError::Malformed(format!("GET {path}: {e}")))
    }
}

#[async_trait]
impl MarketDataSource for UpbitClient {
    /// GET /v1/ticker?markets=A,B,...
    #[instrument(skip(self), name = "upbit::fetch_tickers")]
    async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, DataError> {
        let path = format!("/v1/ticker?markets={}", symbols.join(","));
        let raw: Vec<RawTicker> = self.get_json(&path).await?;
        let tickers = tickers_from_raw(raw)?;
        debug!(count = tickers.len(), "tickers fetched");
        Ok(tickers)
    }

    /// GET /v1/candles/minutes/{unit}?market=X&count=N (newest-first).
    #[instrument(skip(self), name = "upbit::fetch_candles")]
    async fn fetch_candles(&self, symbol: &str, count: u32) -> Result<Vec<PricePoint>, DataError> {
        let count = count.min(MAX_CANDLE_COUNT);
        let path = format!(
            "/v1/candles/minutes/{}?market={}&count={}",
            self.candle_unit_minutes, symbol, count
        );
        let raw: Vec<RawCandle> = self.get_json(&path).await?;
        let candles = candles_from_raw(symbol, raw)?;
        debug!(symbol, count = candles.len(), "candles fetched");
        Ok(candles)
    }

    /// GET /v1/market/all?isDetails=false
    #[instrument(skip(self), name = "upbit::list_markets")]
    async fn list_markets(&self) -> Result<Vec<String>, DataError> {
        let raw: Vec<RawMarket> = self.get_json("/v1/market/all?isDetails=false").await?;
        if raw.is_empty() {
            return Err(DataError::Empty("market list".into()));
        }
        Ok(raw.into_iter().map(|m| m.market).collect())
    }
}

impl std::fmt::Debug for UpbitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpbitClient")
            .field("base_url", &self.base_url)
            .field("candle_unit_minutes", &self.candle_unit_minutes)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Payload conversion
// -----------------------------------------------------------------------------

fn tickers_from_raw(raw: Vec<RawTicker>) -> Result<Vec<Ticker>, DataError> {
    if raw.is_empty() {
        return Err(DataError::Empty("ticker batch".into()));
    }
    Ok(raw
        .into_iter()
        .map(|t| Ticker {
            symbol: t.market,
            current_price: t.trade_price,
            volume_24h: t.acc_trade_volume_24h,
            timestamp: t.timestamp,
        })
        .collect())
}

fn candles_from_raw(symbol: &str, raw: Vec<RawCandle>) -> Result<Vec<PricePoint>, DataError> {
    if raw.is_empty() {
        return Err(DataError::Empty(format!("candles for {symbol}")));
    }

    let mut points = Vec::with_capacity(raw.len());
    for candle in raw {
        let Some(timestamp) = candle_timestamp(&candle) else {
            warn!(symbol, "skipping candle without a usable timestamp");
            continue;
        };
        points.push(PricePoint::new(
            timestamp,
            candle.trade_price,
            candle.candle_acc_trade_volume,
        ));
    }

    if points.is_empty() {
        return Err(DataError::Malformed(format!("no candle for {symbol} carried a timestamp")));
    }
    Ok(points)
}

/// Candle start time in epoch millis.
///
/// `candle_date_time_utc` identifies the candle itself; the `timestamp` field
/// is the last trade inside it and is only used as a fallback.
fn candle_timestamp(candle: &RawCandle) -> Option<i64> {
    candle
        .candle_date_time_utc
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|dt| dt.and_utc().timestamp_millis())
        .or(candle.timestamp)
}

/// Decode a ticker response body.
#[cfg(test)]
fn parse_tickers(body: &str) -> Result<Vec<Ticker>, DataError> {
    let raw: Vec<RawTicker> =
        serde_json::from_str(body).map_err(|e| DataError::Malformed(format!("ticker: {e}")))?;
    tickers_from_raw(raw)
}

/// Decode a minute-candle response body.
#[cfg(test)]
fn parse_candles(symbol: &str, body: &str) -> Result<Vec<PricePoint>, DataError> {
    let raw: Vec<RawCandle> =
        serde_json::from_str(body).map_err(|e| DataError::Malformed(format!("candles: {e}")))?;
    candles_from_raw(symbol, raw)
}

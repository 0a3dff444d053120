// =============================================================================
// Collection Pipeline: batched, rate-limited fetch → analyse loop
// =============================================================================
//
// Per run:
//   1. Partition the requested symbols into ordered chunks of `batch_size`.
//   2. Per chunk: one batched ticker lookup, then one candle lookup per
//      symbol, each followed by the indicator battery and the scorer.
//   3. Per-symbol failures are logged and recorded; the run continues.
//
// Every outbound call, retries included, passes through the shared
// `RateLimiter` first. Transient provider errors (transport, 429, 5xx) are
// retried up to `max_retries` times with doubling backoff.
//
// The run as a whole fails only when symbols were requested and not a single
// provider call succeeded.
// =============================================================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::{analyze_series, AnalysisResult};
use crate::error::{AnalysisError, DataError, PipelineError};
use crate::market_data::{MarketDataSource, PriceSeries};
use crate::signals::PumpScorer;
use crate::upbit::RateLimiter;

/// Markets quoted in KRW carry this prefix on Upbit.
pub const KRW_PREFIX: &str = "KRW-";

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch_size: usize,
    pub candle_count: u32,
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further attempt.
    pub retry_backoff: Duration,
    /// Symbols of one chunk analysed concurrently. 1 = sequential.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            candle_count: 200,
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            concurrency: 1,
        }
    }
}

/// A symbol that produced no result, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<SymbolFailure>,
    /// 24 h traded volume per symbol, as reported by the ticker batch.
    pub volumes_24h: HashMap<String, Decimal>,
}

/// Provider call counters for one run.
#[derive(Debug, Default)]
struct CallStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl CallStats {
    fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Split `symbols` into ordered chunks of at most `size` (minimum 1).
pub fn partition(symbols: &[String], size: usize) -> Vec<&[String]> {
    symbols.chunks(size.max(1)).collect()
}

pub struct CollectionPipeline {
    source: Arc<dyn MarketDataSource>,
    limiter: Arc<RateLimiter>,
    settings: PipelineSettings,
    scorer: PumpScorer,
}

impl CollectionPipeline {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        limiter: Arc<RateLimiter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            limiter,
            settings,
            scorer: PumpScorer::new(),
        }
    }

    /// Analyse `symbols` and return only the results.
    pub async fn run_analysis(&self, symbols: &[String]) -> Result<Vec<AnalysisResult>, PipelineError> {
        Ok(self.run(symbols).await?.results)
    }

    /// Analyse `symbols`, keeping the per-symbol failure list.
    pub async fn run(&self, symbols: &[String]) -> Result<BatchOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let stats = CallStats::default();
        let chunks = partition(symbols, self.settings.batch_size);

        info!(%run_id, symbols = symbols.len(), chunks = chunks.len(), "analysis run started");

        let mut results = Vec::with_capacity(symbols.len());
        let mut failures = Vec::new();
        let mut volumes_24h = HashMap::new();

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let tickers = match self
                .call_with_retry(&stats, "fetch_tickers", || self.source.fetch_tickers(chunk))
                .await
            {
                Ok(tickers) => tickers,
                Err(e) => {
                    warn!(chunk = idx, size = chunk.len(), error = %e, "ticker batch failed, skipping chunk");
                    failures.extend(chunk.iter().map(|symbol| SymbolFailure {
                        symbol: symbol.clone(),
                        reason: format!("ticker batch: {e}"),
                    }));
                    continue;
                }
            };

            let prices: HashMap<&str, Decimal> = tickers
                .iter()
                .map(|t| (t.symbol.as_str(), t.current_price))
                .collect();
            volumes_24h.extend(
                tickers
                    .iter()
                    .filter_map(|t| t.volume_24h.map(|v| (t.symbol.clone(), v))),
            );

            // Futures are built up front and polled in order by `buffered`.
            let jobs: Vec<_> = chunk
                .iter()
                .map(|symbol| self.analyze_symbol(symbol, prices.get(symbol.as_str()).copied(), &stats))
                .collect();
            let outcomes: Vec<_> = stream::iter(jobs)
                .buffered(self.settings.concurrency.max(1))
                .collect()
                .await;

            for (symbol, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        warn!(symbol = %symbol, chunk = idx, error = %e, "symbol skipped");
                        failures.push(SymbolFailure {
                            symbol: symbol.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        if !symbols.is_empty() && stats.succeeded() == 0 {
            error!(%run_id, failed_calls = stats.failed(), "no provider call succeeded");
            return Err(PipelineError::ProviderUnreachable {
                failures: stats.failed(),
            });
        }

        info!(
            %run_id,
            analysed = results.len(),
            skipped = failures.len(),
            provider_calls = stats.succeeded(),
            failed_calls = stats.failed(),
            "analysis run finished"
        );

        Ok(BatchOutcome {
            run_id,
            results,
            failures,
            volumes_24h,
        })
    }

    /// Every KRW-quoted market the provider lists.
    pub async fn discover_markets(&self) -> Result<Vec<String>, DataError> {
        let stats = CallStats::default();
        let markets = self
            .call_with_retry(&stats, "list_markets", || self.source.list_markets())
            .await?;
        let krw: Vec<String> = markets
            .into_iter()
            .filter(|m| m.starts_with(KRW_PREFIX))
            .collect();
        info!(count = krw.len(), "KRW markets discovered");
        Ok(krw)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn analyze_symbol(
        &self,
        symbol: &str,
        current_price: Option<Decimal>,
        stats: &CallStats,
    ) -> Result<AnalysisResult, AnalysisError> {
        let current_price =
            current_price.ok_or_else(|| DataError::Empty(format!("no ticker for {symbol}")))?;

        let candles = self
            .call_with_retry(stats, "fetch_candles", || {
                self.source.fetch_candles(symbol, self.settings.candle_count)
            })
            .await?;

        let series = PriceSeries::from_unordered(candles);
        analyze_series(symbol, current_price, &series, &self.scorer, Utc::now())
    }

    /// Acquire the limiter, call, and retry transient failures.
    async fn call_with_retry<T, F, Fut>(
        &self,
        stats: &CallStats,
        call_name: &'static str,
        mut call: F,
    ) -> Result<T, DataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.limiter.acquire().await;

            match call().await {
                Ok(value) => {
                    stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);

                    if !e.is_transient() || attempt >= self.settings.max_retries {
                        debug!(call = call_name, attempt, error = %e, "provider call failed");
                        return Err(e);
                    }

                    let delay = self
                        .settings
                        .retry_backoff
                        .saturating_mul(1u32 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        call = call_name,
                        attempt,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient provider error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for CollectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionPipeline")
            .field("limiter", &self.limiter)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{PricePoint, Ticker};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// In-memory provider with scriptable failures.
    #[derive(Default)]
    struct FakeSource {
        /// Candle fetches for these symbols fail with HTTP 404.
        broken: HashSet<String>,
        /// Candle fetches for these symbols fail with HTTP 503 this many times.
        flaky: Mutex<HashMap<String, u32>>,
        /// Ticker batches containing any of these symbols fail with HTTP 400.
        broken_tickers: HashSet<String>,
        /// Symbols left out of ticker responses.
        unlisted: HashSet<String>,
        /// Candles for these symbols carry zero volume throughout.
        no_volume: HashSet<String>,
        /// Every call fails with a transient error.
        down: bool,
        markets: Vec<String>,
        ticker_calls: AtomicUsize,
        candle_calls: AtomicUsize,
    }

    fn status(code: u16) -> DataError {
        DataError::Status {
            status: code,
            body: String::new(),
        }
    }

    /// Deterministic per-symbol history: 60 candles, slope varies by name.
    fn history(symbol: &str) -> Vec<PricePoint> {
        let slope = (symbol.len() % 4) as i64 + 1;
        (0..60)
            .rev()
            .map(|i| {
                PricePoint::new(
                    i * 60_000,
                    Decimal::from(1_000 + slope * i),
                    Decimal::from(5 + (i % 7)),
                )
            })
            .collect()
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn fetch_tickers(&self, symbols: &[String]) -> Result<Vec<Ticker>, DataError> {
            self.ticker_calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(status(503));
            }
            if symbols.iter().any(|s| self.broken_tickers.contains(s)) {
                return Err(status(400));
            }
            Ok(symbols
                .iter()
                .filter(|s| !self.unlisted.contains(*s))
                .map(|s| Ticker {
                    symbol: s.clone(),
                    current_price: Decimal::from(1_100),
                    volume_24h: Some(Decimal::from(1_000 + s.len() as i64)),
                    timestamp: None,
                })
                .collect())
        }

        async fn fetch_candles(&self, symbol: &str, _count: u32) -> Result<Vec<PricePoint>, DataError> {
            self.candle_calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(status(503));
            }
            if self.broken.contains(symbol) {
                return Err(status(404));
            }
            if let Some(left) = self.flaky.lock().get_mut(symbol) {
                if *left > 0 {
                    *left -= 1;
                    return Err(status(503));
                }
            }
            let mut candles = history(symbol);
            if self.no_volume.contains(symbol) {
                candles.iter_mut().for_each(|c| c.volume = Decimal::ZERO);
            }
            Ok(candles)
        }

        async fn list_markets(&self) -> Result<Vec<String>, DataError> {
            if self.down {
                return Err(status(503));
            }
            Ok(self.markets.clone())
        }
    }

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("KRW-C{i:02}")).collect()
    }

    fn fast_settings() -> PipelineSettings {
        PipelineSettings {
            retry_backoff: Duration::from_millis(1),
            ..PipelineSettings::default()
        }
    }

    fn pipeline(source: Arc<FakeSource>, settings: PipelineSettings) -> CollectionPipeline {
        CollectionPipeline::new(
            source,
            Arc::new(RateLimiter::new(Duration::from_millis(1))),
            settings,
        )
    }

    #[test]
    fn partition_keeps_order_and_remainder() {
        let syms = symbols(25);
        let chunks = partition(&syms, 10);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(chunks[2][0], "KRW-C20");
        assert!(partition(&[], 10).is_empty());
        assert_eq!(partition(&syms, 0).len(), 25);
    }

    #[tokio::test]
    async fn analyses_every_symbol_in_order() {
        let source = Arc::new(FakeSource::default());
        let syms = symbols(25);
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();

        let got: Vec<&str> = outcome.results.iter().map(|r| r.symbol.as_str()).collect();
        let want: Vec<&str> = syms.iter().map(String::as_str).collect();
        assert_eq!(got, want);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.volumes_24h.len(), 25);
        assert_eq!(outcome.volumes_24h["KRW-C07"], Decimal::from(1_007));
        assert_eq!(source.ticker_calls.load(Ordering::SeqCst), 3);
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn one_failing_symbol_is_skipped() {
        let syms = symbols(10);
        let source = Arc::new(FakeSource {
            broken: HashSet::from([syms[3].clone()]),
            ..FakeSource::default()
        });
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();

        assert_eq!(outcome.results.len(), 9);
        assert!(outcome.results.iter().all(|r| r.symbol != syms[3]));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].symbol, syms[3]);
        // 404 is not retried.
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn zero_volume_symbol_is_skipped() {
        let syms = symbols(4);
        let source = Arc::new(FakeSource {
            no_volume: HashSet::from([syms[2].clone()]),
            ..FakeSource::default()
        });
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();

        let got: Vec<&str> = outcome.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(got, vec![syms[0].as_str(), syms[1].as_str(), syms[3].as_str()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].symbol, syms[2]);
        assert!(outcome.failures[0].reason.contains("division by zero"));
        // Not a provider failure, so no retry.
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn unreachable_provider_fails_the_run() {
        let source = Arc::new(FakeSource {
            down: true,
            ..FakeSource::default()
        });
        let err = pipeline(source.clone(), fast_settings())
            .run_analysis(&symbols(3))
            .await
            .unwrap_err();
        // One ticker batch, tried 1 + 2 times.
        assert!(matches!(err, PipelineError::ProviderUnreachable { failures: 3 }));
        assert_eq!(source.ticker_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_request_is_not_an_error() {
        let source = Arc::new(FakeSource {
            down: true,
            ..FakeSource::default()
        });
        let results = pipeline(source.clone(), fast_settings()).run_analysis(&[]).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(source.ticker_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let syms = symbols(1);
        let source = Arc::new(FakeSource {
            flaky: Mutex::new(HashMap::from([(syms[0].clone(), 2)])),
            ..FakeSource::default()
        });
        let results = pipeline(source.clone(), fast_settings()).run_analysis(&syms).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let syms = symbols(2);
        let source = Arc::new(FakeSource {
            flaky: Mutex::new(HashMap::from([(syms[0].clone(), 5)])),
            ..FakeSource::default()
        });
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.failures[0].symbol, syms[0]);
        // 3 attempts for the flaky symbol, 1 for the healthy one.
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn ticker_failure_skips_its_chunk_only() {
        let syms = symbols(15);
        let source = Arc::new(FakeSource {
            broken_tickers: HashSet::from([syms[4].clone()]),
            ..FakeSource::default()
        });
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();
        assert_eq!(outcome.results.len(), 5);
        assert_eq!(outcome.failures.len(), 10);
        assert_eq!(outcome.results[0].symbol, syms[10]);
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn missing_ticker_skips_symbol_without_fetching_candles() {
        let syms = symbols(3);
        let source = Arc::new(FakeSource {
            unlisted: HashSet::from([syms[1].clone()]),
            ..FakeSource::default()
        });
        let outcome = pipeline(source.clone(), fast_settings()).run(&syms).await.unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.failures[0].symbol, syms[1]);
        assert!(outcome.failures[0].reason.contains("no ticker"));
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrency_does_not_change_results() {
        let syms = symbols(12);
        let sequential = pipeline(Arc::new(FakeSource::default()), fast_settings())
            .run_analysis(&syms)
            .await
            .unwrap();
        let concurrent = pipeline(
            Arc::new(FakeSource::default()),
            PipelineSettings {
                concurrency: 4,
                ..fast_settings()
            },
        )
        .run_analysis(&syms)
        .await
        .unwrap();

        let key = |r: &AnalysisResult| (r.symbol.clone(), r.pump_score, r.trend, r.signals.clone());
        assert_eq!(
            sequential.iter().map(key).collect::<Vec<_>>(),
            concurrent.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn every_call_waits_for_the_limiter() {
        let interval = Duration::from_millis(5);
        let source = Arc::new(FakeSource::default());
        let pipeline = CollectionPipeline::new(
            source.clone(),
            Arc::new(RateLimiter::new(interval)),
            fast_settings(),
        );

        let start = tokio::time::Instant::now();
        pipeline.run_analysis(&symbols(6)).await.unwrap();
        // 1 ticker call + 6 candle calls, spaced by the limiter.
        assert!(start.elapsed() >= interval * 6);
    }

    #[tokio::test]
    async fn discovers_only_krw_markets() {
        let source = Arc::new(FakeSource {
            markets: vec![
                "KRW-BTC".into(),
                "BTC-ETH".into(),
                "KRW-XRP".into(),
                "USDT-BTC".into(),
            ],
            ..FakeSource::default()
        });
        let markets = pipeline(source, fast_settings()).discover_markets().await.unwrap();
        assert_eq!(markets, vec!["KRW-BTC".to_string(), "KRW-XRP".to_string()]);
    }
}

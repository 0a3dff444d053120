// =============================================================================
// Central Application State: Alt Radar
// =============================================================================
//
// Shared across the refresh task and the REST handlers via `Arc<AppState>`.
//
// Thread safety:
//   - The pipeline is immutable after construction; its RateLimiter carries
//     its own async mutex.
//   - parking_lot::RwLock guards the latest snapshot. It is only ever
//     replaced wholesale with a completed run, never mutated in place.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::error::PipelineError;
use crate::pipeline::{BatchOutcome, CollectionPipeline};
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// LatestAnalysis
// =============================================================================

/// Results of the most recent completed scheduled run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAnalysis {
    pub run_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<AnalysisResult>,
    pub failure_count: usize,
    /// 24 h traded volume by symbol; absent when the ticker omitted it.
    pub volumes_24h: HashMap<String, Decimal>,
}

impl LatestAnalysis {
    pub fn from_outcome(outcome: BatchOutcome, completed_at: DateTime<Utc>) -> Self {
        Self {
            run_id: outcome.run_id,
            completed_at,
            failure_count: outcome.failures.len(),
            results: outcome.results,
            volumes_24h: outcome.volumes_24h,
        }
    }

    pub fn find(&self, symbol: &str) -> Option<&AnalysisResult> {
        self.results
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn volume_24h(&self, symbol: &str) -> Option<Decimal> {
        self.volumes_24h.get(symbol).copied()
    }
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    pub config: RuntimeConfig,
    pub pipeline: CollectionPipeline,
    latest: RwLock<Option<Arc<LatestAnalysis>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig, pipeline: CollectionPipeline) -> Self {
        Self {
            config,
            pipeline,
            latest: RwLock::new(None),
            start_time: Instant::now(),
        }
    }

    /// Cheap clone of the current snapshot; the lock is released immediately.
    pub fn latest(&self) -> Option<Arc<LatestAnalysis>> {
        self.latest.read().clone()
    }

    /// Publish `snapshot` wholesale and hand back the shared copy.
    pub fn replace_latest(&self, snapshot: LatestAnalysis) -> Arc<LatestAnalysis> {
        let snapshot = Arc::new(snapshot);
        *self.latest.write() = Some(snapshot.clone());
        snapshot
    }

    /// Explicit market list, or every KRW market the provider lists.
    pub async fn resolve_markets(&self, requested: &[String]) -> Result<Vec<String>, PipelineError> {
        if !requested.is_empty() {
            return Ok(requested.to_vec());
        }
        if !self.config.markets.is_empty() {
            return Ok(self.config.markets.clone());
        }
        self.pipeline.discover_markets().await.map_err(|e| {
            warn!(error = %e, "market discovery failed");
            PipelineError::ProviderUnreachable { failures: 1 }
        })
    }

    /// Run the pipeline over the configured universe and publish the result.
    ///
    /// A failed run leaves the previous snapshot in place.
    pub async fn refresh(&self) -> Result<Arc<LatestAnalysis>, PipelineError> {
        let markets = self.resolve_markets(&[]).await?;
        let outcome = self.pipeline.run(&markets).await?;
        let snapshot = LatestAnalysis::from_outcome(outcome, Utc::now());

        info!(
            run_id = %snapshot.run_id,
            results = snapshot.results.len(),
            failures = snapshot.failure_count,
            "latest analysis replaced"
        );

        Ok(self.replace_latest(snapshot))
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::types::Trend;
    use std::collections::HashSet;

    #[tokio::test]
    async fn refresh_discovers_krw_markets_and_publishes() {
        let source = StubSource {
            markets: vec!["KRW-BTC".into(), "BTC-ETH".into(), "KRW-ETH".into()],
            falling: HashSet::from(["KRW-ETH".to_string()]),
            ..StubSource::default()
        };
        let state = state_with(source, RuntimeConfig::default());
        assert!(state.latest().is_none());

        let snapshot = state.refresh().await.unwrap();
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.failure_count, 0);

        let latest = state.latest().unwrap();
        assert_eq!(latest.run_id, snapshot.run_id);
        assert_eq!(latest.find("krw-btc").unwrap().trend, Trend::Bullish);
        assert_eq!(latest.find("KRW-ETH").unwrap().trend, Trend::Bearish);
        assert!(latest.find("BTC-ETH").is_none());
        assert!(latest.volume_24h("KRW-BTC").is_none());
    }

    #[tokio::test]
    async fn snapshot_carries_ticker_volume() {
        let config = RuntimeConfig {
            markets: vec!["KRW-XRP".into(), "KRW-SOL".into()],
            ..RuntimeConfig::default()
        };
        let source = StubSource {
            volumes: HashMap::from([("KRW-XRP".to_string(), Decimal::from(42))]),
            ..StubSource::default()
        };
        let state = state_with(source, config);
        let snapshot = state.refresh().await.unwrap();
        assert_eq!(snapshot.volume_24h("KRW-XRP"), Some(Decimal::from(42)));
        assert_eq!(snapshot.volume_24h("KRW-SOL"), None);
    }

    #[tokio::test]
    async fn configured_markets_skip_discovery() {
        let config = RuntimeConfig {
            markets: vec!["KRW-XRP".into()],
            ..RuntimeConfig::default()
        };
        let state = state_with(StubSource::default(), config);
        let snapshot = state.refresh().await.unwrap();
        assert_eq!(snapshot.results[0].symbol, "KRW-XRP");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let config = RuntimeConfig {
            markets: vec!["KRW-XRP".into()],
            ..RuntimeConfig::default()
        };
        let state = state_with(StubSource::default(), config.clone());
        let first = state.refresh().await.unwrap();

        let broken = state_with(
            StubSource {
                down: true,
                ..StubSource::default()
            },
            config,
        );
        broken.replace_latest((*first).clone());
        assert!(broken.refresh().await.is_err());
        assert_eq!(broken.latest().unwrap().run_id, first.run_id);
    }
}

// =============================================================================
// Runtime Configuration: JSON settings file with env overrides
// =============================================================================
//
// Every field carries a serde default so partial files (or `{}`) load. The
// file is read once at startup; a few deployment-specific values can then be
// overridden from the environment (`.env` included):
//
//   RADAR_CONFIG     path of the JSON file (default `radar_config.json`)
//   RADAR_MARKETS    comma-separated market list, e.g. `KRW-BTC,KRW-ETH`
//   RADAR_BIND_ADDR  REST listen address
//
// Saving uses an atomic tmp + rename so a crash never leaves a torn file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::PipelineSettings;
use crate::upbit::client::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "radar_config.json";

pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG";
pub const ENV_MARKETS: &str = "RADAR_MARKETS";
pub const ENV_BIND_ADDR: &str = "RADAR_BIND_ADDR";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_candle_unit_minutes() -> u32 {
    1
}

fn default_candle_count() -> u32 {
    200
}

fn default_batch_size() -> usize {
    10
}

fn default_request_interval_ms() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_concurrency() -> usize {
    1
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe ------------------------------------------------------------

    /// Markets to analyse. Empty means every KRW market the provider lists.
    #[serde(default)]
    pub markets: Vec<String>,

    // --- Provider ------------------------------------------------------------

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Minute-candle unit requested from the provider.
    #[serde(default = "default_candle_unit_minutes")]
    pub candle_unit_minutes: u32,

    /// Candles fetched per symbol (provider caps this at 200).
    #[serde(default = "default_candle_count")]
    pub candle_count: u32,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // --- Collection ----------------------------------------------------------

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Minimum spacing between outbound requests.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    // --- REST ----------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            markets: Vec::new(),
            base_url: default_base_url(),
            candle_unit_minutes: default_candle_unit_minutes(),
            candle_count: default_candle_count(),
            http_timeout_secs: default_http_timeout_secs(),
            batch_size: default_batch_size(),
            request_interval_ms: default_request_interval_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrency: default_concurrency(),
            refresh_interval_secs: default_refresh_interval_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Errors are returned so the caller can fall back to defaults with a
    /// warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            markets = config.markets.len(),
            base_url = %config.base_url,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `RADAR_MARKETS` / `RADAR_BIND_ADDR` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_MARKETS).filter(|v| !v.trim().is_empty()) {
            self.markets = parse_market_list(&raw);
            info!(markets = ?self.markets, "markets overridden from environment");
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR).filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
            info!(bind_addr = %self.bind_addr, "bind address overridden from environment");
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            batch_size: self.batch_size.max(1),
            candle_count: self.candle_count,
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            concurrency: self.concurrency.max(1),
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Split a comma list into trimmed, upper-cased, de-duplicated market codes.
pub fn parse_market_list(raw: &str) -> Vec<String> {
    let mut markets: Vec<String> = Vec::new();
    for market in raw.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        let market = market.to_ascii_uppercase();
        if !markets.contains(&market) {
            markets.push(market);
        }
    }
    markets
}

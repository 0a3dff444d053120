// =============================================================================
// Alt Radar: Main Entry Point
// =============================================================================
//
// Scans Upbit KRW markets on a schedule, scores each one for pump
// likelihood, and serves the latest snapshot over REST.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod persistence;
mod pipeline;
mod runtime_config;
mod signals;
mod types;
mod upbit;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::persistence::AnalysisRecord;
use crate::pipeline::CollectionPipeline;
use crate::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use crate::upbit::{RateLimiter, UpbitClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Alt Radar starting up");

    let config_path = PathBuf::from(
        std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );

    let mut config = if config_path.exists() {
        RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            RuntimeConfig::default()
        })
    } else {
        warn!(path = %config_path.display(), "Config file not found, writing defaults");
        let defaults = RuntimeConfig::default();
        if let Err(e) = defaults.save(&config_path) {
            warn!(error = %e, "Failed to write default config");
        }
        defaults
    };
    config.apply_env_overrides();

    let universe = if config.markets.is_empty() {
        "all KRW".to_string()
    } else {
        config.markets.join(",")
    };
    info!(
        markets = %universe,
        batch_size = config.batch_size,
        request_interval_ms = config.request_interval_ms,
        refresh_interval_secs = config.refresh_interval_secs,
        "Configuration resolved"
    );

    // ── 2. Provider, rate limiter, pipeline ──────────────────────────────
    let client = UpbitClient::new(
        config.base_url.clone(),
        config.candle_unit_minutes,
        config.http_timeout(),
    )
    .context("failed to build Upbit HTTP client")?;
    let limiter = Arc::new(RateLimiter::new(config.request_interval()));
    let pipeline = CollectionPipeline::new(Arc::new(client), limiter, config.pipeline_settings());

    let bind_addr = config.bind_addr.clone();
    let refresh_every = config.refresh_interval();
    let state = Arc::new(AppState::new(config, pipeline));

    // ── 3. Scheduled refresh (first tick fires immediately) ──────────────
    let refresh_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match refresh_state.refresh().await {
                Ok(snapshot) => {
                    for result in &snapshot.results {
                        let record = AnalysisRecord::from(result);
                        debug!(
                            symbol = %record.symbol,
                            score = %record.pump_score,
                            risk = %record.risk_level,
                            signals = %record.signals,
                            signal_count = record.signal_kinds().len(),
                            "analysis row ready"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Scheduled refresh failed; keeping previous snapshot"),
            }
        }
    });

    // ── 4. REST API ──────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    info!("Alt Radar shut down complete.");
    Ok(())
}

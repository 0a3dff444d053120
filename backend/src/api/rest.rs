// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// Read endpoints serve the latest scheduled snapshot from `AppState`; only
// `/api/market-analysis` and `POST /api/refresh` reach the provider.
//
// CORS is configured permissively; the dashboard is served from elsewhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::AnalysisResult;
use crate::app_state::{AppState, LatestAnalysis};
use crate::runtime_config::parse_market_list;
use crate::types::{RiskLevel, Trend};

const DEFAULT_PUMP_LIMIT: usize = 10;
const DEFAULT_MIN_SCORE: Decimal = dec!(70);
const DEFAULT_MIN_VOLUME: Decimal = dec!(10000000);

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/market-analysis", get(market_analysis))
        .route("/api/refresh", post(refresh))
        .route("/api/all", get(all_results))
        .route("/api/pump-potential", get(pump_potential))
        .route("/api/bullish-high-potential", get(bullish_high_potential))
        .route("/api/high-volume-high-potential", get(high_volume_high_potential))
        .route("/api/trend/:trend", get(by_trend))
        .route("/api/risk/:risk", get(by_risk))
        .route("/api/market/:symbol", get(market))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Response helpers
// =============================================================================

/// Envelope used by the provider-backed endpoints.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Envelope<T: Serialize> {
    Success {
        status: &'static str,
        timestamp: i64,
        data: T,
    },
    Error {
        status: &'static str,
        timestamp: i64,
        message: String,
    },
}

impl<T: Serialize> Envelope<T> {
    fn success(data: T) -> Self {
        Self::Success {
            status: "success",
            timestamp: chrono::Utc::now().timestamp(),
            data,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            status: "error",
            timestamp: chrono::Utc::now().timestamp(),
            message: message.into(),
        }
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Latest snapshot results matching `keep`, score descending.
fn filtered(
    state: &AppState,
    keep: impl Fn(&LatestAnalysis, &AnalysisResult) -> bool,
) -> Vec<AnalysisResult> {
    let Some(latest) = state.latest() else {
        return Vec::new();
    };
    let mut out: Vec<AnalysisResult> = latest
        .results
        .iter()
        .filter(|r| keep(&latest, r))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.pump_score.cmp(&a.pump_score));
    out
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: i64,
    last_run_id: Option<String>,
    /// Seconds since the latest snapshot completed; `None` before the first run.
    snapshot_age_secs: Option<i64>,
    snapshot_size: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let latest = state.latest();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        server_time: now.timestamp_millis(),
        last_run_id: latest.as_ref().map(|l| l.run_id.to_string()),
        snapshot_age_secs: latest.as_ref().map(|l| (now - l.completed_at).num_seconds()),
        snapshot_size: latest.as_ref().map_or(0, |l| l.results.len()),
    })
}

// =============================================================================
// On-demand analysis
// =============================================================================

#[derive(Debug, Deserialize)]
struct MarketsQuery {
    #[serde(default)]
    markets: Option<String>,
}

async fn market_analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarketsQuery>,
) -> impl IntoResponse {
    let requested = query.markets.as_deref().map(parse_market_list).unwrap_or_default();

    let markets = match state.resolve_markets(&requested).await {
        Ok(markets) => markets,
        Err(e) => return Json(Envelope::<Vec<AnalysisResult>>::error(e.to_string())),
    };

    match state.pipeline.run_analysis(&markets).await {
        Ok(results) => {
            info!(requested = markets.len(), analysed = results.len(), "on-demand analysis served");
            Json(Envelope::success(results))
        }
        Err(e) => {
            warn!(error = %e, "on-demand analysis failed");
            Json(Envelope::error(e.to_string()))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshSummary {
    run_id: String,
    results: usize,
    failures: usize,
}

async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.refresh().await {
        Ok(snapshot) => Json(Envelope::success(RefreshSummary {
            run_id: snapshot.run_id.to_string(),
            results: snapshot.results.len(),
            failures: snapshot.failure_count,
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "manual refresh failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(Envelope::<RefreshSummary>::error(e.to_string())),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Snapshot queries
// =============================================================================

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn all_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let mut results = filtered(&state, |_, _| true);
    if let Some(limit) = query.limit {
        results.truncate(limit);
    }
    Json(results)
}

#[derive(Debug, Deserialize)]
struct PumpQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_score: Option<Decimal>,
}

async fn pump_potential(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PumpQuery>,
) -> impl IntoResponse {
    let min_score = query.min_score.unwrap_or(DEFAULT_MIN_SCORE);
    let mut results = filtered(&state, |_, r| r.pump_score >= min_score);
    results.truncate(query.limit.unwrap_or(DEFAULT_PUMP_LIMIT));
    Json(results)
}

async fn bullish_high_potential(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PumpQuery>,
) -> impl IntoResponse {
    let min_score = query.min_score.unwrap_or(DEFAULT_MIN_SCORE);
    let mut results = filtered(&state, |_, r| {
        r.trend == Trend::Bullish && r.pump_score >= min_score
    });
    results.truncate(query.limit.unwrap_or(DEFAULT_PUMP_LIMIT));
    Json(results)
}

#[derive(Debug, Deserialize)]
struct VolumeQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_volume: Option<Decimal>,
}

/// Symbols whose 24 h ticker volume reaches `min_volume`; symbols without a
/// reported volume never match.
async fn high_volume_high_potential(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VolumeQuery>,
) -> impl IntoResponse {
    let min_volume = query.min_volume.unwrap_or(DEFAULT_MIN_VOLUME);
    let mut results = filtered(&state, |latest, r| {
        latest.volume_24h(&r.symbol).is_some_and(|v| v >= min_volume)
    });
    results.truncate(query.limit.unwrap_or(DEFAULT_PUMP_LIMIT));
    Json(results)
}

async fn by_trend(State(state): State<Arc<AppState>>, Path(trend): Path<String>) -> Response {
    match trend.parse::<Trend>() {
        Ok(trend) => Json(filtered(&state, |_, r| r.trend == trend)).into_response(),
        Err(e) => bad_request(e),
    }
}

async fn by_risk(State(state): State<Arc<AppState>>, Path(risk): Path<String>) -> Response {
    match risk.parse::<RiskLevel>() {
        Ok(risk) => Json(filtered(&state, |_, r| r.risk_level == risk)).into_response(),
        Err(e) => bad_request(e),
    }
}

async fn market(State(state): State<Arc<AppState>>, Path(symbol): Path<String>) -> Response {
    let found = state.latest().and_then(|l| l.find(&symbol).cloned());
    match found {
        Some(result) => Json(result).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no analysis for {symbol}") })),
        )
            .into_response(),
    }
}

//! The miner's HTTP surface.

pub mod models;

use crate::{
    observability::metrics::{encode_metrics, MinerMetrics},
    services::{
        health::HealthTracker,
        lines::LineChecker,
        proof::{CapturedSession, ProofGenerator, SessionCapture},
    },
};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use models::{CheckRequest, CheckResponse, HealthResponse, ProofRequest, ProofResponse};
use prometheus::Registry;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};
use tracing::warn;
use uuid::Uuid;

/// Everything the handlers need, shared across requests.
#[derive(Clone)]
pub struct AppState {
    /// The health tracker.
    pub health: Arc<HealthTracker>,

    /// The line checker.
    pub checker: Arc<LineChecker>,

    /// The proof generator stub.
    pub proofs: Arc<ProofGenerator>,

    /// Captured line check sessions.
    pub captures: Arc<Mutex<SessionCapture>>,

    /// The metric bundle.
    pub metrics: Arc<MinerMetrics>,

    /// The registry backing `/metrics`.
    pub registry: Arc<Registry>,

    /// Per-source-ip token bucket.
    pub rate_limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl AppState {
    /// Builds the per-source rate limiter from the configured bucket shape.
    pub fn build_rate_limiter(capacity: u32, rate_per_second: u32) -> Arc<DefaultKeyedRateLimiter<IpAddr>> {
        let rate = NonZeroU32::new(rate_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let capacity = NonZeroU32::new(capacity.max(1)).unwrap_or(NonZeroU32::MIN);
        Arc::new(RateLimiter::keyed(Quota::per_second(rate).allow_burst(capacity)))
    }
}

/// Assembles the miner router.
///
/// `/health` and `/metrics` are exempt from rate limiting.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/v1/check", post(check))
        .route("/v1/proof", post(proof))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new().merge(api).route("/health", get(health)).route("/metrics", get(metrics)).with_state(state)
}

async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check_key(&addr.ip()).is_err() {
        warn!(source = %addr.ip(), "Rate limit exceeded");
        let body = Json(serde_json::json!({ "error": "rate limit exceeded" }));
        return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    }
    next.run(request).await
}

async fn check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, Response> {
    request.validate().map_err(|e| {
        let body = Json(serde_json::json!({ "error": e.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    })?;

    let started = Instant::now();
    let results = state.checker.check(&request.lines).await;
    let elapsed = started.elapsed();

    state.metrics.checks.inc();
    state.metrics.lines_checked.inc_by(request.lines.len() as u64);
    state.metrics.check_duration.observe(elapsed.as_secs_f64());

    let query_id = Uuid::new_v4().to_string();
    let sport = request.lines.first().map(|line| line.sport.clone()).unwrap_or_default();
    state.captures.lock().unwrap_or_else(PoisonError::into_inner).record(CapturedSession {
        query_id: query_id.clone(),
        request_url: format!("https://api.the-odds-api.com/v4/sports/{sport}/odds"),
        captured_at: Instant::now(),
    });

    let available_indices = results.iter().filter(|result| result.available).map(|result| result.index).collect();
    Ok(Json(CheckResponse {
        query_id,
        results,
        available_indices,
        response_time_ms: elapsed.as_secs_f64() * 1000.0,
    }))
}

async fn proof(
    State(state): State<AppState>,
    Json(request): Json<ProofRequest>,
) -> Result<Json<ProofResponse>, Response> {
    request.validate().map_err(|e| {
        let body = Json(serde_json::json!({ "error": e.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    })?;

    // A capture from the check phase strengthens the (stubbed) proof input;
    // proofs without one still go through.
    let captured_url = {
        let mut captures = state.captures.lock().unwrap_or_else(PoisonError::into_inner);
        let url = captures.get(&request.query_id).map(|session| session.request_url.clone());
        if url.is_some() {
            captures.remove(&request.query_id);
        }
        url
    };
    let session_data = match captured_url {
        Some(url) => format!("{}|{}", url, request.session_data),
        None => request.session_data.clone(),
    };

    let proof = state.proofs.generate(&request.query_id, &session_data);
    state.metrics.proofs.inc();
    Ok(Json(ProofResponse {
        query_id: proof.query_id,
        proof_hash: proof.proof_hash,
        status: proof.status,
        message: proof.message,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    state.health.record_ping();
    state.metrics.health_pings.inc();
    let status = state.health.status();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uid: status.uid,
        odds_api_connected: status.odds_api_connected,
        bt_connected: status.bt_connected,
        uptime_seconds: status.uptime_seconds,
    })
}

async fn metrics(State(state): State<AppState>) -> Result<String, Response> {
    encode_metrics(&state.registry).map_err(|e| {
        let body = Json(serde_json::json!({ "error": e.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    })
}

//! The validator's HTTP surface.
//!
//! A thin layer over the services: bodies are validated here, business
//! negatives (unavailable lines, degraded gates) travel as successful
//! responses, and only malformed requests or internal faults map to error
//! statuses.

pub mod models;
mod mpc;
mod outcomes;
mod purchase;
mod shares;
mod system;

use crate::{
    channels::ChainNeuron,
    observability::metrics::ValidatorMetrics,
    services::{outcomes::OutcomeAttestor, purchase::PurchaseOrchestrator, shares::ShareStore},
};
use basic_types::ValidatorId;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use models::ValidationError;
use prometheus::Registry;
use protocols::sessions::SessionTable;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{Arc, Mutex},
    time::Instant,
};
use tracing::warn;

/// Everything the handlers need, shared across requests.
#[derive(Clone)]
pub struct AppState {
    /// The local share store.
    pub store: Arc<ShareStore>,

    /// The purchase orchestrator.
    pub orchestrator: Arc<PurchaseOrchestrator>,

    /// The shared set membership session table.
    pub sessions: Arc<Mutex<SessionTable>>,

    /// The outcome attestor.
    pub attestor: Arc<OutcomeAttestor>,

    /// The hotkey this validator attests under.
    pub hotkey: ValidatorId,

    /// The chain neuron.
    pub neuron: Arc<dyn ChainNeuron>,

    /// The metric bundle.
    pub metrics: Arc<ValidatorMetrics>,

    /// The registry backing `/metrics`.
    pub registry: Arc<Registry>,

    /// When the node started.
    pub started_at: Instant,

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

/// Assembles the validator router.
///
/// `/health` and `/metrics` are exempt from rate limiting.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/v1/shares/store", post(shares::store_share))
        .route("/v1/shares/:signal_id", get(shares::has_share))
        .route("/v1/shares/release", post(shares::release_share))
        .route("/v1/purchase", post(purchase::purchase))
        .route("/v1/mpc/round1", post(mpc::round1))
        .route("/v1/mpc/contribute", post(mpc::contribute))
        .route("/v1/outcomes/attest", post(outcomes::attest))
        .route("/v1/outcomes/:signal_id", get(outcomes::consensus))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(api)
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .with_state(state)
}

async fn rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check_key(&addr.ip()).is_err() {
        warn!(source = %addr.ip(), "Rate limit exceeded");
        return ApiError::new(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }
    next.run(request).await
}

/// An error response with a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Constructs an error response.
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into() }
    }

    /// A 404 for an unknown entity.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// A 500 for internal faults.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

//! Health and metrics endpoints.

use super::{models::HealthResponse, ApiError, AppState};
use crate::observability::metrics::encode_metrics;
use axum::{extract::State, Json};

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uid: state.neuron.uid(),
        bt_connected: state.neuron.is_registered(),
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
        active_signals: state.store.count(),
    })
}

pub(super) async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    encode_metrics(&state.registry).map_err(|e| ApiError::internal(e.to_string()))
}

//! Share storage endpoints.

use super::{
    models::{ReleaseRequest, ReleaseResponse, StoreShareRequest, StoreShareResponse},
    ApiError, AppState,
};
use crate::services::shares::StoreOutcome;
use axum::{
    extract::{Path, State},
    Json,
};

pub(super) async fn store_share(
    State(state): State<AppState>,
    Json(request): Json<StoreShareRequest>,
) -> Result<Json<StoreShareResponse>, ApiError> {
    let (share, ciphertext) = request.validate()?;
    let outcome = state.store.store(&request.signal_id, &request.genius_address, share, ciphertext);
    let status = match outcome {
        StoreOutcome::Stored => {
            state.metrics.shares_stored.inc();
            state.metrics.active_signals.set(state.store.count() as i64);
            "stored"
        }
        StoreOutcome::DuplicateIgnored => "duplicate_ignored",
    };
    Ok(Json(StoreShareResponse { status }))
}

pub(super) async fn has_share(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.has(&signal_id) {
        return Err(ApiError::not_found(format!("no share held for signal {signal_id}")));
    }
    Ok(Json(serde_json::json!({ "signal_id": signal_id, "held": true })))
}

pub(super) async fn release_share(
    State(state): State<AppState>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    match state.store.release(&request.signal_id, &request.buyer_address) {
        Some(ciphertext) => {
            state.metrics.shares_released.inc();
            Ok(Json(ReleaseResponse { encrypted_key_share: hex::encode(ciphertext) }))
        }
        None => Err(ApiError::not_found(format!("no share held for signal {}", request.signal_id))),
    }
}

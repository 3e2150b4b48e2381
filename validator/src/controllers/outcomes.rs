//! Outcome attestation endpoints.

use super::{
    models::{AttestApiRequest, AttestApiResponse, ConsensusParams, ConsensusResponse},
    ApiError, AppState,
};
use crate::services::outcomes::EventStatus;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

pub(super) async fn attest(
    State(state): State<AppState>,
    Json(request): Json<AttestApiRequest>,
) -> Result<Json<AttestApiResponse>, ApiError> {
    let outcome = request.validate()?;
    if !state.store.has(&request.signal_id) {
        return Err(ApiError::not_found(format!("no share held for signal {}", request.signal_id)));
    }

    let event_result = state.attestor.fetch_event_result(&request.event_id, &request.sport).await;
    if event_result.status == EventStatus::Error {
        // Transient; the caller retries at the next epoch.
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "scores feed unreachable"));
    }
    let event_status = event_result.status;
    let attestation = state.attestor.attest(&request.signal_id, state.hotkey.clone(), outcome, event_result);
    state.metrics.attestations.inc();

    Ok(Json(AttestApiResponse {
        signal_id: attestation.signal_id,
        outcome: attestation.outcome.code(),
        event_status: format!("{event_status:?}").to_lowercase(),
    }))
}

pub(super) async fn consensus(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
    Query(params): Query<ConsensusParams>,
) -> Json<ConsensusResponse> {
    let total_validators = params.total_validators();
    let outcome = state.attestor.check_consensus(&signal_id, total_validators);
    let attestations = state.attestor.attestations(&signal_id).len();
    Json(ConsensusResponse {
        signal_id,
        outcome: outcome.map(|outcome| outcome.code()),
        pending: outcome.is_none(),
        attestations,
        total_validators,
    })
}

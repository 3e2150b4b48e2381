//! Set membership endpoints.

use super::{
    models::{ContributeResponse, Round1Request, Round1Response},
    ApiError, AppState,
};
use crate::channels::ContributionRequest;
use axum::{extract::State, http::StatusCode, Json};
use math_lib::{encode_hex, FieldElement};
use protocols::{
    set_membership::{eval_gate_polynomial, weigh_share},
    MpcError,
};
use std::sync::PoisonError;
use tracing::warn;

/// Accepts a contribution pushed by a peer for a session we aggregate.
pub(super) async fn round1(
    State(state): State<AppState>,
    Json(request): Json<Round1Request>,
) -> Result<Json<Round1Response>, ApiError> {
    let contribution = request.validate()?;
    let mut sessions = state.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    let session = sessions
        .get_mut(&request.session_id)
        .ok_or_else(|| ApiError::not_found(format!("unknown session {}", request.session_id)))?;
    if session.gate_idx() != request.gate_idx {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "gate index mismatch"));
    }
    match session.add_contribution(contribution) {
        Ok(()) => {
            state.metrics.mpc_contributions.inc();
            Ok(Json(Round1Response { status: "accepted" }))
        }
        // Bad contributions are discarded without failing the session; the
        // sender still gets a successful response with a negative status.
        Err(e @ (MpcError::DuplicateContributor(_) | MpcError::UnknownParticipant(_) | MpcError::SessionTimeout)) => {
            warn!(session_id = %request.session_id, "Contribution discarded: {e}");
            Ok(Json(Round1Response { status: "discarded" }))
        }
        Err(e) => Err(ApiError::new(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Computes this validator's contribution for a gate another validator drives.
pub(super) async fn contribute(
    State(state): State<AppState>,
    Json(request): Json<ContributionRequest>,
) -> Result<Json<ContributeResponse>, ApiError> {
    let record = state
        .store
        .get(&request.signal_id)
        .ok_or_else(|| ApiError::not_found(format!("no share held for signal {}", request.signal_id)))?;

    let weighted_share = weigh_share(&record.share, &request.participants)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let gate_eval = eval_gate_polynomial(&FieldElement::from_u32(record.share.x), &request.available_indices)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(ContributeResponse {
        validator_x: record.share.x,
        d_value: encode_hex(&weighted_share),
        e_value: encode_hex(&gate_eval),
    }))
}

//! The purchase endpoint.

use super::{
    models::{PurchaseApiRequest, PurchaseApiResponse},
    ApiError, AppState,
};
use crate::services::purchase::{PurchaseError, PurchaseOutcome, PurchaseRequest};
use axum::{extract::State, Json};

pub(super) async fn purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseApiRequest>,
) -> Result<Json<PurchaseApiResponse>, ApiError> {
    let available_indices = request.validate()?;
    let outcome = state
        .orchestrator
        .purchase(PurchaseRequest {
            signal_id: request.signal_id,
            buyer_address: request.buyer_address,
            sportsbook: request.sportsbook,
            available_indices,
        })
        .await;
    match outcome {
        Ok(PurchaseOutcome::Available { encrypted_key_shares }) => {
            state.metrics.purchases.with_label_values(&["available"]).inc();
            let participating = encrypted_key_shares.len();
            let encoded = encrypted_key_shares.iter().map(hex::encode).collect();
            Ok(Json(PurchaseApiResponse {
                status: "available",
                encrypted_key_shares: Some(encoded),
                participating_validators: participating,
            }))
        }
        // A negative gate decision is a successful response, not an error.
        Ok(PurchaseOutcome::Unavailable { participating_validators, .. }) => {
            state.metrics.purchases.with_label_values(&["unavailable"]).inc();
            Ok(Json(PurchaseApiResponse {
                status: "unavailable",
                encrypted_key_shares: None,
                participating_validators,
            }))
        }
        Err(PurchaseError::UnknownSignal(signal_id)) => {
            state.metrics.purchases.with_label_values(&["error"]).inc();
            Err(ApiError::not_found(format!("no share held for signal {signal_id}")))
        }
        Err(e @ PurchaseError::InsufficientValidators { .. }) => {
            state.metrics.purchases.with_label_values(&["error"]).inc();
            Err(ApiError::new(axum::http::StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(PurchaseError::Session(e)) => {
            state.metrics.purchases.with_label_values(&["error"]).inc();
            Err(ApiError::new(axum::http::StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

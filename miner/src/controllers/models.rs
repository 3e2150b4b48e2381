//! Request and response bodies for the miner API.

use crate::services::lines::{CandidateLine, LineResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_QUERY_ID_LENGTH: usize = 256;
const MAX_SESSION_DATA_LENGTH: usize = 10_000;
const MAX_LINES: usize = 10;

/// A rejected request body.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Body of `POST /v1/check`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    /// The candidate lines to check, between one and ten.
    pub lines: Vec<CandidateLine>,
}

impl CheckRequest {
    /// Validates the candidate batch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() || self.lines.len() > MAX_LINES {
            return Err(ValidationError("lines must contain between 1 and 10 entries".to_string()));
        }
        for line in &self.lines {
            if !(1..=MAX_LINES as u32).contains(&line.index) {
                return Err(ValidationError("line index must be in [1, 10]".to_string()));
            }
            if line.sport.is_empty() || line.event_id.is_empty() {
                return Err(ValidationError("sport and event_id must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Response of `POST /v1/check`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// The capture id for a later proof of this check.
    pub query_id: String,

    /// Per-line verdicts.
    pub results: Vec<LineResult>,

    /// The indices reported available.
    pub available_indices: Vec<u32>,

    /// How long the check took.
    pub response_time_ms: f64,
}

/// Body of `POST /v1/proof`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofRequest {
    /// The query the proof covers.
    pub query_id: String,

    /// Opaque session material from the check phase.
    pub session_data: String,
}

impl ProofRequest {
    /// Validates the body's size bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query_id.is_empty() || self.query_id.len() > MAX_QUERY_ID_LENGTH {
            return Err(ValidationError("query_id must be between 1 and 256 characters".to_string()));
        }
        if self.session_data.len() > MAX_SESSION_DATA_LENGTH {
            return Err(ValidationError("session_data is too long".to_string()));
        }
        Ok(())
    }
}

/// Response of `POST /v1/proof`.
#[derive(Debug, Serialize)]
pub struct ProofResponse {
    /// The query the proof covers.
    pub query_id: String,

    /// The proof digest.
    pub proof_hash: String,

    /// `submitted`, `verified` or `failed`.
    pub status: &'static str,

    /// Human readable detail.
    pub message: String,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,

    /// The crate version.
    pub version: &'static str,

    /// Our uid on the subnet, when registered.
    pub uid: Option<u16>,

    /// Whether the odds feed answered the last connectivity probe.
    pub odds_api_connected: bool,

    /// Whether the chain neuron is registered.
    pub bt_connected: bool,

    /// Seconds since the miner started.
    pub uptime_seconds: f64,
}

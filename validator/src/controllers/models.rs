//! Request and response bodies for the validator API.

use crate::services::outcomes::Outcome;
use math_lib::{decode_hex, FieldElement};
use protocols::set_membership::Contribution;
use serde::{Deserialize, Serialize};
use shamir_sharing::{Share, SHARE_COUNT};
use std::collections::BTreeSet;
use thiserror::Error;

const MAX_SIGNAL_ID_LENGTH: usize = 256;

/// A rejected request body.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn validate_identifier(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError(format!("{field} must not be empty")));
    }
    if value.len() > MAX_SIGNAL_ID_LENGTH {
        return Err(ValidationError(format!("{field} is too long")));
    }
    Ok(())
}

fn validate_abscissa(value: u32, field: &str) -> Result<(), ValidationError> {
    if !(1..=SHARE_COUNT).contains(&value) {
        return Err(ValidationError(format!("{field} must be in [1, 10]")));
    }
    Ok(())
}

fn decode_field_element(value: &str, field: &str) -> Result<FieldElement, ValidationError> {
    decode_hex(value).map_err(|e| ValidationError(format!("{field} is not a valid hex field element: {e}")))
}

/// Body of `POST /v1/shares/store`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreShareRequest {
    /// The signal the share belongs to.
    pub signal_id: String,

    /// The issuing genius.
    pub genius_address: String,

    /// The share abscissa assigned to this validator.
    pub share_x: u32,

    /// The index share ordinate, hex encoded.
    pub share_y: String,

    /// The encrypted key share, hex encoded.
    pub encrypted_key_share: String,
}

impl StoreShareRequest {
    /// Validates the body into a share and ciphertext.
    pub fn validate(&self) -> Result<(Share, Vec<u8>), ValidationError> {
        validate_identifier(&self.signal_id, "signal_id")?;
        validate_identifier(&self.genius_address, "genius_address")?;
        validate_abscissa(self.share_x, "share_x")?;
        let y = decode_field_element(&self.share_y, "share_y")?;
        let ciphertext = hex::decode(self.encrypted_key_share.trim_start_matches("0x"))
            .map_err(|_| ValidationError("encrypted_key_share is not valid hex".to_string()))?;
        if ciphertext.is_empty() {
            return Err(ValidationError("encrypted_key_share must not be empty".to_string()));
        }
        Ok((Share { x: self.share_x, y }, ciphertext))
    }
}

/// Response of `POST /v1/shares/store`.
#[derive(Debug, Serialize)]
pub struct StoreShareResponse {
    /// `stored` or `duplicate_ignored`.
    pub status: &'static str,
}

/// Body of `POST /v1/shares/release`, sent by peer validators.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    /// The signal whose key share to release.
    pub signal_id: String,

    /// The buyer the release is for.
    pub buyer_address: String,
}

/// Response of `POST /v1/shares/release`.
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    /// The encrypted key share, hex encoded.
    pub encrypted_key_share: String,
}

/// Body of `POST /v1/purchase`.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseApiRequest {
    /// The signal being purchased.
    pub signal_id: String,

    /// The buyer's address.
    pub buyer_address: String,

    /// The sportsbook the buyer intends to bet at.
    pub sportsbook: String,

    /// The line indices the miner reported available.
    pub available_indices: Vec<u32>,
}

impl PurchaseApiRequest {
    /// Validates the availability set.
    pub fn validate(&self) -> Result<BTreeSet<u32>, ValidationError> {
        validate_identifier(&self.signal_id, "signal_id")?;
        validate_identifier(&self.buyer_address, "buyer_address")?;
        if self.available_indices.is_empty() || self.available_indices.len() > SHARE_COUNT as usize {
            return Err(ValidationError("available_indices must contain between 1 and 10 entries".to_string()));
        }
        for index in &self.available_indices {
            validate_abscissa(*index, "available_indices")?;
        }
        Ok(self.available_indices.iter().copied().collect())
    }
}

/// Response of `POST /v1/purchase`.
#[derive(Debug, Serialize)]
pub struct PurchaseApiResponse {
    /// `available` or `unavailable`.
    pub status: &'static str,

    /// The hex encoded key shares, present when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_key_shares: Option<Vec<String>>,

    /// How many validators contributed to the gate.
    pub participating_validators: usize,
}

/// Body of `POST /v1/mpc/round1`: a pushed gate contribution.
#[derive(Debug, Clone, Deserialize)]
pub struct Round1Request {
    /// The session the contribution belongs to.
    pub session_id: String,

    /// The gate index within the session.
    pub gate_idx: u32,

    /// The contributor's share abscissa.
    pub validator_x: u32,

    /// The Lagrange weighted share, hex encoded.
    pub d_value: String,

    /// The public gate evaluation, hex encoded.
    pub e_value: String,
}

impl Round1Request {
    /// Validates the body into a contribution.
    ///
    /// The pushed `(d, e)` pair is collapsed into the single product the
    /// gate aggregates.
    pub fn validate(&self) -> Result<Contribution, ValidationError> {
        validate_identifier(&self.session_id, "session_id")?;
        validate_abscissa(self.validator_x, "validator_x")?;
        let weighted_share = decode_field_element(&self.d_value, "d_value")?;
        let gate_eval = decode_field_element(&self.e_value, "e_value")?;
        Ok(Contribution { x: self.validator_x, value: weighted_share * &gate_eval })
    }
}

/// Response of `POST /v1/mpc/round1`.
#[derive(Debug, Serialize)]
pub struct Round1Response {
    /// `accepted` or `discarded`.
    pub status: &'static str,
}

/// Response of `POST /v1/mpc/contribute`.
#[derive(Debug, Serialize)]
pub struct ContributeResponse {
    /// The contributor's share abscissa.
    pub validator_x: u32,

    /// The Lagrange weighted share, hex encoded.
    pub d_value: String,

    /// The public gate evaluation, hex encoded.
    pub e_value: String,
}

/// Body of `POST /v1/outcomes/attest`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttestApiRequest {
    /// The signal being attested.
    pub signal_id: String,

    /// The feed event id backing the attestation.
    pub event_id: String,

    /// The sport key the event belongs to.
    pub sport: String,

    /// The attested outcome's integer code.
    pub outcome: u8,
}

impl AttestApiRequest {
    /// Validates the body into an outcome.
    pub fn validate(&self) -> Result<Outcome, ValidationError> {
        validate_identifier(&self.signal_id, "signal_id")?;
        validate_identifier(&self.event_id, "event_id")?;
        validate_identifier(&self.sport, "sport")?;
        Outcome::try_from(self.outcome).map_err(|_| ValidationError("outcome must be in [0, 3]".to_string()))
    }
}

/// Response of `POST /v1/outcomes/attest`.
#[derive(Debug, Serialize)]
pub struct AttestApiResponse {
    /// The signal being attested.
    pub signal_id: String,

    /// The recorded outcome's integer code.
    ///
    /// First write wins, so a repeat attestation echoes the original code.
    pub outcome: u8,

    /// The backing event's resolution status.
    pub event_status: String,
}

/// Query parameters of `GET /v1/outcomes/:signal_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusParams {
    /// The size of the validator set voting on the signal.
    pub total_validators: Option<usize>,
}

impl ConsensusParams {
    /// The validator set size, defaulting to the share count.
    pub fn total_validators(&self) -> usize {
        self.total_validators.unwrap_or(SHARE_COUNT as usize)
    }
}

/// Response of `GET /v1/outcomes/:signal_id`.
#[derive(Debug, Serialize)]
pub struct ConsensusResponse {
    /// The signal the consensus is for.
    pub signal_id: String,

    /// The consensus outcome's integer code, once quorum is reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<u8>,

    /// Whether the signal is still waiting for quorum.
    pub pending: bool,

    /// How many attestations are recorded.
    pub attestations: usize,

    /// The validator set size the quorum was computed against.
    pub total_validators: usize,
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

    /// Whether the chain neuron is registered.
    pub bt_connected: bool,

    /// Seconds since the node started.
    pub uptime_seconds: f64,

    /// Signals we currently hold shares for.
    pub active_signals: usize,
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn store_request() -> StoreShareRequest {
        StoreShareRequest {
            signal_id: "sig-1".to_string(),
            genius_address: "0xGenius".to_string(),
            share_x: 1,
            share_y: "0xabcdef".to_string(),
            encrypted_key_share: "deadbeef".to_string(),
        }
    }

    #[test]
    fn valid_store_request() {
        let (share, ciphertext) = store_request().validate().unwrap();
        assert_eq!(share.x, 1);
        assert_eq!(ciphertext, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[rstest]
    #[case(0)]
    #[case(11)]
    fn share_x_out_of_range(#[case] share_x: u32) {
        let request = StoreShareRequest { share_x, ..store_request() };
        let error = request.validate().unwrap_err();
        assert!(error.0.contains("share_x"));
    }

    #[test]
    fn invalid_hex_share_y() {
        let request = StoreShareRequest { share_y: "not-hex!".to_string(), ..store_request() };
        let error = request.validate().unwrap_err();
        assert!(error.0.contains("share_y"));
    }

    #[test]
    fn invalid_hex_ciphertext() {
        let request = StoreShareRequest { encrypted_key_share: "xyz!!".to_string(), ..store_request() };
        let error = request.validate().unwrap_err();
        assert!(error.0.contains("encrypted_key_share"));
    }

    #[test]
    fn empty_signal_id_rejected() {
        let request = StoreShareRequest { signal_id: String::new(), ..store_request() };
        assert!(request.validate().is_err());
    }

    fn purchase_request(available_indices: Vec<u32>) -> PurchaseApiRequest {
        PurchaseApiRequest {
            signal_id: "sig-1".to_string(),
            buyer_address: "0xBuyer".to_string(),
            sportsbook: "draftkings".to_string(),
            available_indices,
        }
    }

    #[test]
    fn valid_purchase_request() {
        let available = purchase_request(vec![1, 3, 5]).validate().unwrap();
        assert_eq!(available, BTreeSet::from([1, 3, 5]));
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::too_many((1..=11).collect())]
    #[case::out_of_range(vec![1, 2, 12])]
    fn invalid_available_indices(#[case] available_indices: Vec<u32>) {
        assert!(purchase_request(available_indices).validate().is_err());
    }

    #[test]
    fn valid_round1_request() {
        let request = Round1Request {
            session_id: "s-1".to_string(),
            gate_idx: 0,
            validator_x: 1,
            d_value: "0xabcdef".to_string(),
            e_value: "ff00ff".to_string(),
        };
        let contribution = request.validate().unwrap();
        assert_eq!(contribution.x, 1);
    }

    #[test]
    fn invalid_round1_hex_rejected() {
        let request = Round1Request {
            session_id: "s-1".to_string(),
            gate_idx: 0,
            validator_x: 1,
            d_value: "not_hex!".to_string(),
            e_value: "ff00ff".to_string(),
        };
        let error = request.validate().unwrap_err();
        assert!(error.0.contains("d_value"));
    }
}

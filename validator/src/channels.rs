//! Channels to the chain and to other nodes in the network.
//!
//! The core only consumes these narrow capabilities; the mechanics of the
//! chain client and of peer discovery live behind them.

use async_trait::async_trait;
use basic_types::ValidatorId;
use math_lib::decode_hex;
use protocols::set_membership::Contribution;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// The chain-facing capabilities the validator needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainNeuron: Send + Sync + 'static {
    /// Refresh the local view of the metagraph.
    async fn sync_metagraph(&self) -> Result<(), ChannelError>;

    /// The uids of the miners currently registered on the subnet.
    fn get_miner_uids(&self) -> Vec<u16>;

    /// Submit the weight vector for this epoch.
    async fn set_weights(&self, weights: &HashMap<u16, f64>) -> Result<(), ChannelError>;

    /// Whether this node's hotkey is registered on the subnet.
    fn is_registered(&self) -> bool;

    /// This node's uid, when registered.
    fn uid(&self) -> Option<u16>;
}

/// A peer validator holding a share for some signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerShareHolder {
    /// The peer's identity.
    pub validator: ValidatorId,

    /// The abscissa of the peer's share.
    pub x: u32,

    /// The base url of the peer's API.
    pub endpoint: String,
}

/// A request for a peer's contribution to a set membership gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRequest {
    /// The session this gate runs under.
    pub session_id: String,

    /// The gate index within the session.
    pub gate_idx: u32,

    /// The signal whose index share should be weighed.
    pub signal_id: String,

    /// The abscissas of all gate participants.
    pub participants: Vec<u32>,

    /// The miner-reported available line indices.
    pub available_indices: BTreeSet<u32>,
}

/// Channels to the other validators of the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidatorChannels: Send + Sync + 'static {
    /// The peers holding a share for the given signal.
    async fn share_holders(&self, signal_id: &str) -> Result<Vec<PeerShareHolder>, ChannelError>;

    /// Ask a peer for its contribution to a gate.
    async fn request_contribution(
        &self,
        peer: &PeerShareHolder,
        request: &ContributionRequest,
    ) -> Result<Contribution, ChannelError>;

    /// Ask a peer to release its encrypted key share to a buyer.
    async fn request_release(
        &self,
        peer: &PeerShareHolder,
        signal_id: &str,
        buyer_address: &str,
    ) -> Result<Vec<u8>, ChannelError>;
}

/// Channels to the miners of the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MinerChannels: Send + Sync + 'static {
    /// Ping a miner's health endpoint.
    async fn ping_health(&self, uid: u16) -> Result<bool, ChannelError>;

    /// Submit candidate lines to a miner and collect the indices it reports available.
    async fn check_lines(
        &self,
        uid: u16,
        lines: &[crate::services::challenges::ChallengeLine],
    ) -> Result<Vec<u32>, ChannelError>;
}

/// An error talking to the chain or to a peer.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The remote end could not be reached.
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    /// The remote end answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The operation is not available in the current mode.
    #[error("not available: {0}")]
    Unavailable(String),
}

/// A chain neuron for nodes running without chain connectivity.
///
/// The API still serves requests; no weights are ever set.
#[derive(Default)]
pub struct OfflineNeuron;

#[async_trait]
impl ChainNeuron for OfflineNeuron {
    async fn sync_metagraph(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn get_miner_uids(&self) -> Vec<u16> {
        Vec::new()
    }

    async fn set_weights(&self, _weights: &HashMap<u16, f64>) -> Result<(), ChannelError> {
        warn!("Running without chain connectivity, weights will not be set");
        Ok(())
    }

    fn is_registered(&self) -> bool {
        false
    }

    fn uid(&self) -> Option<u16> {
        None
    }
}

#[derive(Serialize)]
struct PeerContributionBody<'a> {
    session_id: &'a str,
    gate_idx: u32,
    signal_id: &'a str,
    participants: &'a [u32],
    available_indices: Vec<u32>,
}

#[derive(Deserialize)]
struct PeerContributionResponse {
    validator_x: u32,
    d_value: String,
    e_value: String,
}

#[derive(Serialize)]
struct PeerReleaseBody<'a> {
    signal_id: &'a str,
    buyer_address: &'a str,
}

#[derive(Deserialize)]
struct PeerReleaseResponse {
    encrypted_key_share: String,
}

/// Peer channels over the validators' HTTP APIs.
pub struct HttpValidatorChannels {
    client: reqwest::Client,
    peers: Vec<PeerShareHolder>,
}

impl HttpValidatorChannels {
    /// Constructs channels over the given static peer set.
    pub fn new(client: reqwest::Client, peers: Vec<PeerShareHolder>) -> Self {
        Self { client, peers }
    }
}

#[async_trait]
impl ValidatorChannels for HttpValidatorChannels {
    async fn share_holders(&self, signal_id: &str) -> Result<Vec<PeerShareHolder>, ChannelError> {
        let mut holders = Vec::new();
        for peer in &self.peers {
            let url = format!("{}/v1/shares/{signal_id}", peer.endpoint);
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => holders.push(peer.clone()),
                Ok(_) => {}
                Err(e) => warn!(peer = %peer.validator, "Peer unreachable during share holder lookup: {e}"),
            }
        }
        Ok(holders)
    }

    async fn request_contribution(
        &self,
        peer: &PeerShareHolder,
        request: &ContributionRequest,
    ) -> Result<Contribution, ChannelError> {
        let url = format!("{}/v1/mpc/contribute", peer.endpoint);
        let body = PeerContributionBody {
            session_id: &request.session_id,
            gate_idx: request.gate_idx,
            signal_id: &request.signal_id,
            participants: &request.participants,
            available_indices: request.available_indices.iter().copied().collect(),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChannelError::InvalidResponse(format!("peer answered {}", response.status())));
        }
        let response: PeerContributionResponse =
            response.json().await.map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        let weighted_share =
            decode_hex(&response.d_value).map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        let gate_eval = decode_hex(&response.e_value).map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        // The wire carries the two factors; the gate only ever sees their product.
        Ok(Contribution { x: response.validator_x, value: weighted_share * &gate_eval })
    }

    async fn request_release(
        &self,
        peer: &PeerShareHolder,
        signal_id: &str,
        buyer_address: &str,
    ) -> Result<Vec<u8>, ChannelError> {
        let url = format!("{}/v1/shares/release", peer.endpoint);
        let body = PeerReleaseBody { signal_id, buyer_address };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChannelError::InvalidResponse(format!("peer answered {}", response.status())));
        }
        let response: PeerReleaseResponse =
            response.json().await.map_err(|e| ChannelError::InvalidResponse(e.to_string()))?;
        hex::decode(response.encrypted_key_share.trim_start_matches("0x"))
            .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
    }
}

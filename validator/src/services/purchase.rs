//! Purchase orchestration.
//!
//! A buyer asks whether a signal's real line is among the indices a miner
//! reported available. The orchestrator runs one set membership gate across
//! the validators holding shares for the signal and, when the gate decides
//! available, collects enough encrypted key shares for the buyer to decrypt
//! the signal key.

use crate::{
    channels::{ContributionRequest, ValidatorChannels},
    services::shares::ShareStore,
};
use protocols::{
    sessions::SessionTable,
    set_membership::{compute_local_contribution, DecisionReason, MembershipSession},
    MpcError,
};
use shamir_sharing::THRESHOLD;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// A buyer's purchase request.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    /// The signal being purchased.
    pub signal_id: String,

    /// The buyer's address.
    pub buyer_address: String,

    /// The sportsbook the buyer intends to bet at.
    pub sportsbook: String,

    /// The line indices the miner reported available there.
    pub available_indices: BTreeSet<u32>,
}

/// The business result of a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The real line is available; the buyer received enough key shares to
    /// decrypt the signal key.
    Available {
        /// The encrypted key shares collected across validators.
        encrypted_key_shares: Vec<Vec<u8>>,
    },

    /// The gate decided the real line is not among the available indices,
    /// or degraded to unavailable for a protocol reason.
    Unavailable {
        /// How many validators contributed to the gate.
        participating_validators: usize,

        /// The protocol reason, when the gate did not decide on the sum.
        reason: Option<DecisionReason>,
    },
}

/// An error that prevents a purchase from being decided at all.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// This validator holds no share for the signal.
    #[error("unknown signal {0}")]
    UnknownSignal(String),

    /// The gate decided available but too few validators released shares.
    #[error("insufficient validators released shares: got {got}, need {need}")]
    InsufficientValidators {
        /// How many key shares were collected.
        got: usize,
        /// How many are needed to reconstruct the key.
        need: usize,
    },

    /// The gate could not be set up.
    #[error(transparent)]
    Session(#[from] MpcError),
}

/// Ties buyer requests to the set membership gate and share release.
pub struct PurchaseOrchestrator {
    store: Arc<ShareStore>,
    channels: Arc<dyn ValidatorChannels>,
    sessions: Arc<Mutex<SessionTable>>,
    session_timeout: Duration,
}

impl PurchaseOrchestrator {
    /// Constructs an orchestrator over the local store and peer channels.
    ///
    /// Sessions are tracked in the shared table so peers pushing late
    /// contributions land in the same gate the orchestrator decides on.
    pub fn new(
        store: Arc<ShareStore>,
        channels: Arc<dyn ValidatorChannels>,
        sessions: Arc<Mutex<SessionTable>>,
        session_timeout: Duration,
    ) -> Self {
        Self { store, channels, sessions, session_timeout }
    }

    /// Runs one purchase end to end.
    ///
    /// Gate degradations (too few peers, session expiry) surface as
    /// [`PurchaseOutcome::Unavailable`], not as errors: the buyer only
    /// learns that the line cannot be bought right now. Repeating a
    /// purchase returns byte identical key shares, which follows from the
    /// share store's idempotent release.
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchaseOutcome, PurchaseError> {
        let record = self
            .store
            .get(&request.signal_id)
            .ok_or_else(|| PurchaseError::UnknownSignal(request.signal_id.clone()))?;

        let peers = match self.channels.share_holders(&request.signal_id).await {
            Ok(peers) => peers,
            Err(e) => {
                warn!(signal_id = %request.signal_id, "Peer lookup failed: {e}");
                Vec::new()
            }
        };
        let peers: Vec<_> = peers.into_iter().filter(|peer| peer.x != record.share.x).collect();

        let mut participants: Vec<u32> = peers.iter().map(|peer| peer.x).collect();
        participants.push(record.share.x);
        participants.sort_unstable();
        participants.dedup();

        let session_id = Uuid::new_v4().to_string();
        let mut session = MembershipSession::new(
            session_id.clone(),
            0,
            request.available_indices.clone(),
            participants.clone(),
            THRESHOLD as usize,
            self.session_timeout,
        )?;

        let local = compute_local_contribution(&record.share, &participants, &request.available_indices)?;
        if let Err(e) = session.add_contribution(local) {
            warn!(%session_id, "Local contribution rejected: {e}");
        }
        // The lock is only ever held between suspension points.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).insert(session)?;

        let contribution_request = ContributionRequest {
            session_id: session_id.clone(),
            gate_idx: 0,
            signal_id: request.signal_id.clone(),
            participants: participants.clone(),
            available_indices: request.available_indices.clone(),
        };
        let collected = futures::future::join_all(peers.iter().map(|peer| {
            let contribution_request = contribution_request.clone();
            async move {
                let result =
                    timeout(self.session_timeout, self.channels.request_contribution(peer, &contribution_request))
                        .await;
                (peer, result)
            }
        }))
        .await;
        for (peer, result) in collected {
            match result {
                Ok(Ok(contribution)) => {
                    let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
                    match sessions.get_mut(&session_id) {
                        Some(session) => {
                            if let Err(e) = session.add_contribution(contribution) {
                                warn!(%session_id, peer = %peer.validator, "Contribution rejected: {e}");
                            }
                        }
                        None => warn!(%session_id, "Session evicted while collecting contributions"),
                    }
                }
                Ok(Err(e)) => warn!(%session_id, peer = %peer.validator, "Peer contribution failed: {e}"),
                Err(_) => warn!(%session_id, peer = %peer.validator, "Peer contribution timed out"),
            }
        }

        let decision = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            match sessions.get_mut(&session_id) {
                Some(session) => session.decide()?,
                None => return Err(PurchaseError::Session(MpcError::SessionTimeout)),
            }
        };
        if !decision.available {
            info!(
                signal_id = %request.signal_id,
                participating = decision.participating_validators,
                reason = ?decision.reason,
                "Purchase gate decided unavailable"
            );
            return Ok(PurchaseOutcome::Unavailable {
                participating_validators: decision.participating_validators,
                reason: decision.reason,
            });
        }

        // The record exists, so the local release cannot miss.
        let mut encrypted_key_shares = Vec::new();
        if let Some(ciphertext) = self.store.release(&request.signal_id, &request.buyer_address) {
            encrypted_key_shares.push(ciphertext);
        }
        let releases = futures::future::join_all(peers.iter().map(|peer| {
            let signal_id = request.signal_id.clone();
            let buyer_address = request.buyer_address.clone();
            async move {
                let result = timeout(
                    self.session_timeout,
                    self.channels.request_release(peer, &signal_id, &buyer_address),
                )
                .await;
                (peer, result)
            }
        }))
        .await;
        for (peer, result) in releases {
            match result {
                Ok(Ok(ciphertext)) => encrypted_key_shares.push(ciphertext),
                Ok(Err(e)) => warn!(peer = %peer.validator, "Peer release failed: {e}"),
                Err(_) => warn!(peer = %peer.validator, "Peer release timed out"),
            }
        }

        if encrypted_key_shares.len() < THRESHOLD as usize {
            return Err(PurchaseError::InsufficientValidators {
                got: encrypted_key_shares.len(),
                need: THRESHOLD as usize,
            });
        }
        info!(
            signal_id = %request.signal_id,
            buyer = %request.buyer_address,
            shares = encrypted_key_shares.len(),
            "Purchase complete"
        );
        Ok(PurchaseOutcome::Available { encrypted_key_shares })
    }
}

#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects, clippy::panic)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelError, MockValidatorChannels, PeerShareHolder};
    use basic_types::ValidatorId;
    use math_lib::{lagrange::Lagrange, FieldElement};
    use protocols::set_membership::eval_gate_polynomial;
    use shamir_sharing::{generate_signal_index_shares, Share};

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn make_sessions() -> Arc<Mutex<SessionTable>> {
        Arc::new(Mutex::new(SessionTable::default()))
    }

    fn make_peer(x: u32) -> PeerShareHolder {
        PeerShareHolder {
            validator: ValidatorId::from(format!("5Peer{x}")),
            x,
            endpoint: format!("http://validator-{x}.local"),
        }
    }

    /// One share per holder whose weighted gate products sum to zero, so the
    /// gate decides available. The closing abscissa (the highest holder)
    /// must lie off the availability set.
    fn vanishing_shares(holders: u32, available: &BTreeSet<u32>) -> Vec<Share> {
        let participants: Vec<u32> = (1..=holders).collect();
        let lagrange = Lagrange::new(&participants).unwrap();
        let mut shares: Vec<Share> = participants[..participants.len() - 1]
            .iter()
            .map(|x| Share { x: *x, y: FieldElement::gen_random() })
            .collect();

        let mut sum = FieldElement::ZERO;
        for share in &shares {
            let gate = eval_gate_polynomial(&FieldElement::from_u32(share.x), available).unwrap();
            sum = sum + &(lagrange.partial(share.x, &share.y).unwrap() * &gate);
        }
        let closing = holders;
        assert!(!available.contains(&closing), "closing abscissa must be off the gate's roots");
        let gate = eval_gate_polynomial(&FieldElement::from_u32(closing), available).unwrap();
        let factor = *lagrange.coefficient(closing).unwrap() * &gate;
        shares.push(Share { x: closing, y: -sum * &factor.inv().unwrap() });
        shares
    }

    /// Builds a store holding share x=1 and mock peers holding x=2..=holders.
    fn make_network(shares: Vec<Share>, holders: u32) -> (Arc<ShareStore>, MockValidatorChannels) {
        let store = Arc::new(ShareStore::new());
        store.store("sig", "0xG", shares[0], b"local-ct".to_vec());

        let peers: Vec<_> = (2..=holders).map(make_peer).collect();
        let mut channels = MockValidatorChannels::new();
        channels.expect_share_holders().returning(move |_| Ok(peers.clone()));

        channels.expect_request_contribution().returning(move |peer, request| {
            let share = shares[peer.x as usize - 1];
            compute_local_contribution(&share, &request.participants, &request.available_indices)
                .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
        });
        channels
            .expect_request_release()
            .returning(|peer, _, _| Ok(format!("peer-ct-{}", peer.x).into_bytes()));
        (store, channels)
    }

    fn make_request(available: &[u32]) -> PurchaseRequest {
        PurchaseRequest {
            signal_id: "sig".to_string(),
            buyer_address: "0xBuyer".to_string(),
            sportsbook: "draftkings".to_string(),
            available_indices: available.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn vanishing_gate_sum_releases_shares() {
        let available = BTreeSet::from([1, 3, 5]);
        let (store, channels) = make_network(vanishing_shares(7, &available), 7);
        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);

        let outcome = orchestrator.purchase(make_request(&[1, 3, 5])).await.unwrap();
        match outcome {
            PurchaseOutcome::Available { encrypted_key_shares } => {
                assert_eq!(encrypted_key_shares.len(), 7);
                assert!(encrypted_key_shares.contains(&b"local-ct".to_vec()));
            }
            other => panic!("expected available, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_gate_sum_releases_nothing() {
        let shares = generate_signal_index_shares(5).unwrap();
        let (store, channels) = make_network(shares, 7);
        let store_check = store.clone();
        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);

        let outcome = orchestrator.purchase(make_request(&[1, 2, 3, 4])).await.unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Unavailable { reason: None, .. }));
        assert!(store_check.get("sig").unwrap().released_to.is_empty());
    }

    #[tokio::test]
    async fn repeated_purchases_return_identical_shares() {
        let available = BTreeSet::from([2, 4]);
        let (store, channels) = make_network(vanishing_shares(7, &available), 7);
        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);

        let request = make_request(&[2, 4]);
        let first = orchestrator.purchase(request.clone()).await.unwrap();
        let second = orchestrator.purchase(request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_signal_is_an_error() {
        let (_, channels) = make_network(generate_signal_index_shares(1).unwrap(), 7);
        let orchestrator =
            PurchaseOrchestrator::new(Arc::new(ShareStore::new()), Arc::new(channels), make_sessions(), TIMEOUT);

        let result = orchestrator.purchase(make_request(&[1])).await;
        assert!(matches!(result, Err(PurchaseError::UnknownSignal(_))));
    }

    #[tokio::test]
    async fn too_few_holders_degrades_to_unavailable() {
        // Only 5 validators hold shares: the gate cannot reach threshold,
        // no matter what the contributions sum to.
        let available = BTreeSet::from([1, 2, 3]);
        let (store, channels) = make_network(vanishing_shares(5, &available), 5);
        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);

        let outcome = orchestrator.purchase(make_request(&[1, 2, 3])).await.unwrap();
        match outcome {
            PurchaseOutcome::Unavailable { participating_validators, reason } => {
                assert_eq!(participating_validators, 5);
                assert_eq!(reason, Some(DecisionReason::InsufficientContributions));
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_releases_are_an_error() {
        let available = BTreeSet::from([4]);
        let shares = vanishing_shares(7, &available);
        let store = Arc::new(ShareStore::new());
        store.store("sig", "0xG", shares[0], b"local-ct".to_vec());

        let peers: Vec<_> = (2..=7).map(make_peer).collect();
        let mut channels = MockValidatorChannels::new();
        channels.expect_share_holders().returning(move |_| Ok(peers.clone()));
        channels.expect_request_contribution().returning(move |peer, request| {
            let share = shares[peer.x as usize - 1];
            compute_local_contribution(&share, &request.participants, &request.available_indices)
                .map_err(|e| ChannelError::InvalidResponse(e.to_string()))
        });
        channels
            .expect_request_release()
            .returning(|_, _, _| Err(ChannelError::Unreachable("peer down".to_string())));

        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);
        let result = orchestrator.purchase(make_request(&[4])).await;
        assert!(matches!(result, Err(PurchaseError::InsufficientValidators { got: 1, need: 7 })));
    }

    #[tokio::test]
    async fn empty_availability_set_is_rejected() {
        let (store, channels) = make_network(generate_signal_index_shares(1).unwrap(), 7);
        let orchestrator = PurchaseOrchestrator::new(store, Arc::new(channels), make_sessions(), TIMEOUT);
        let result = orchestrator.purchase(make_request(&[])).await;
        assert!(matches!(result, Err(PurchaseError::Session(MpcError::OutOfRange))));
    }
}

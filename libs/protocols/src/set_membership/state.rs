//! Set membership session state.

use super::{
    contribution::{validate_available_indices, Contribution},
    output::{check_availability, AvailabilityResult, DecisionReason},
};
use crate::errors::MpcError;
use basic_types::Jar;
use shamir_sharing::SHARE_COUNT;
use std::{
    collections::BTreeSet,
    time::{Duration, Instant},
};
use tracing::warn;

/// Each of the session state definitions.
pub mod states {
    use super::*;

    /// We are collecting contributions from the participating validators.
    #[derive(Debug)]
    pub struct Collecting {
        /// The abscissas expected to contribute.
        pub participants: BTreeSet<u32>,

        /// The contributions received so far, keyed by abscissa.
        pub contributions: Jar<u32, Contribution>,
    }
}

/// The state of a set membership session.
#[derive(Debug)]
pub enum SessionState {
    /// Contributions are still being collected.
    Collecting(states::Collecting),

    /// The gate has been decided.
    Decided(AvailabilityResult),

    /// The session expired before a decision could be made.
    Expired,
}

/// One run of the set membership gate for a single signal.
///
/// Sessions collect one contribution per participating validator and decide
/// once, caching the decision. An expired session always decides
/// unavailable.
#[derive(Debug)]
pub struct MembershipSession {
    session_id: String,
    gate_idx: u32,
    available: BTreeSet<u32>,
    threshold: usize,
    deadline: Instant,
    state: SessionState,
}

impl MembershipSession {
    /// Creates a session for the given gate.
    ///
    /// The participant set must be agreed on before any validator weighs its
    /// share; contributions from abscissas outside it are discarded.
    pub fn new(
        session_id: String,
        gate_idx: u32,
        available: BTreeSet<u32>,
        participants: Vec<u32>,
        threshold: usize,
        timeout: Duration,
    ) -> Result<Self, MpcError> {
        validate_available_indices(&available)?;
        if participants.iter().any(|x| !(1..=SHARE_COUNT).contains(x)) {
            return Err(MpcError::OutOfRange);
        }
        let participants: BTreeSet<u32> = participants.into_iter().collect();
        let contributions = Jar::new(participants.len());
        let state = SessionState::Collecting(states::Collecting { participants, contributions });
        Ok(Self {
            session_id,
            gate_idx,
            available,
            threshold,
            deadline: Instant::now().checked_add(timeout).unwrap_or_else(Instant::now),
            state,
        })
    }

    /// The id this session is known by across validators.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The gate index, disambiguating gates within a session.
    pub fn gate_idx(&self) -> u32 {
        self.gate_idx
    }

    /// The availability set this gate is deciding membership of.
    pub fn available(&self) -> &BTreeSet<u32> {
        &self.available
    }

    /// Whether this session ran out of time.
    pub fn is_expired(&self) -> bool {
        matches!(self.state, SessionState::Expired)
            || (matches!(self.state, SessionState::Collecting(_)) && Instant::now() >= self.deadline)
    }

    /// Whether every participant has contributed.
    pub fn is_ready(&self) -> bool {
        match &self.state {
            SessionState::Collecting(state) => state.contributions.is_full(),
            SessionState::Decided(_) => true,
            SessionState::Expired => false,
        }
    }

    /// The current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handles a single peer contribution.
    ///
    /// Invalid contributions are discarded without aborting the session: a
    /// faulty peer must not be able to kill a gate other peers can still
    /// complete.
    pub fn add_contribution(&mut self, contribution: Contribution) -> Result<(), MpcError> {
        if self.is_expired() {
            self.state = SessionState::Expired;
            return Err(MpcError::SessionTimeout);
        }
        let state = match &mut self.state {
            SessionState::Collecting(state) => state,
            SessionState::Decided(_) | SessionState::Expired => {
                warn!(session_id = %self.session_id, "Discarding contribution for finished session");
                return Ok(());
            }
        };
        if !state.participants.contains(&contribution.x) {
            return Err(MpcError::UnknownParticipant(contribution.x));
        }
        state
            .contributions
            .add_element(contribution.x, contribution)
            .map_err(|_| MpcError::DuplicateContributor(contribution.x))?;
        Ok(())
    }

    /// Decides the gate, caching the result.
    ///
    /// An expired session decides unavailable; an under-threshold decision
    /// reports how many validators made it in time.
    pub fn decide(&mut self) -> Result<AvailabilityResult, MpcError> {
        match &self.state {
            SessionState::Decided(result) => return Ok(result.clone()),
            SessionState::Expired => {
                return Ok(AvailabilityResult::unavailable(0, DecisionReason::SessionTimeout));
            }
            SessionState::Collecting(_) => {}
        }
        if Instant::now() >= self.deadline && !self.is_ready() {
            let participating = match &self.state {
                SessionState::Collecting(state) => state.contributions.len(),
                _ => 0,
            };
            self.state = SessionState::Expired;
            return Ok(AvailabilityResult::unavailable(participating, DecisionReason::SessionTimeout));
        }
        let contributions: Vec<Contribution> = match &self.state {
            SessionState::Collecting(state) => state.contributions.elements().map(|(_, c)| *c).collect(),
            // Unreachable: handled above.
            _ => Vec::new(),
        };
        let result = check_availability(&contributions, &self.available, self.threshold)?;
        self.state = SessionState::Decided(result.clone());
        Ok(result)
    }
}

#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_membership::{
        compute_local_contribution, eval_gate_polynomial, DEFAULT_SESSION_TIMEOUT,
    };
    use math_lib::{lagrange::Lagrange, FieldElement};
    use shamir_sharing::{generate_signal_index_shares, Share};

    fn make_session(available: BTreeSet<u32>, participants: Vec<u32>) -> MembershipSession {
        MembershipSession::new("session-1".into(), 0, available, participants, 7, DEFAULT_SESSION_TIMEOUT).unwrap()
    }

    /// One share per participant whose weighted gate products sum to zero;
    /// the closing abscissa must lie off the gate's roots.
    fn vanishing_contributions(participants: &[u32], available: &BTreeSet<u32>) -> Vec<Contribution> {
        let lagrange = Lagrange::new(participants).unwrap();
        let mut shares: Vec<Share> = participants[..participants.len() - 1]
            .iter()
            .map(|x| Share { x: *x, y: FieldElement::gen_random() })
            .collect();

        let mut sum = FieldElement::ZERO;
        for share in &shares {
            let gate = eval_gate_polynomial(&FieldElement::from_u32(share.x), available).unwrap();
            sum = sum + &(lagrange.partial(share.x, &share.y).unwrap() * &gate);
        }
        let closing = *participants.last().unwrap();
        let gate = eval_gate_polynomial(&FieldElement::from_u32(closing), available).unwrap();
        let factor = *lagrange.coefficient(closing).unwrap() * &gate;
        shares.push(Share { x: closing, y: -sum * &factor.inv().unwrap() });

        shares
            .iter()
            .map(|share| compute_local_contribution(share, participants, available).unwrap())
            .collect()
    }

    fn real_contributions(real_index: u32, participants: &[u32], available: &BTreeSet<u32>) -> Vec<Contribution> {
        let shares = generate_signal_index_shares(real_index).unwrap();
        shares
            .iter()
            .filter(|share| participants.contains(&share.x))
            .map(|share| compute_local_contribution(share, participants, available).unwrap())
            .collect()
    }

    #[test]
    fn full_session_decides_on_the_sum() {
        let available = BTreeSet::from([1, 3, 5]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session = make_session(available.clone(), participants.clone());

        for contribution in vanishing_contributions(&participants, &available) {
            assert!(!session.is_ready());
            session.add_contribution(contribution).unwrap();
        }
        assert!(session.is_ready());

        let result = session.decide().unwrap();
        assert!(result.available);
        assert_eq!(result.participating_validators, 7);
    }

    #[test]
    fn nonzero_sum_decides_unavailable() {
        let available = BTreeSet::from([1, 2, 3, 4]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session = make_session(available.clone(), participants.clone());

        for contribution in real_contributions(5, &participants, &available) {
            session.add_contribution(contribution).unwrap();
        }
        let result = session.decide().unwrap();
        assert!(!result.available);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn decision_is_cached() {
        let available = BTreeSet::from([2]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session = make_session(available.clone(), participants.clone());
        for contribution in vanishing_contributions(&participants, &available) {
            session.add_contribution(contribution).unwrap();
        }
        let first = session.decide().unwrap();
        let second = session.decide().unwrap();
        assert_eq!(first, second);
        assert!(first.available);
    }

    #[test]
    fn duplicate_contribution_rejected_but_session_survives() {
        let available = BTreeSet::from([1, 2]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session = make_session(available.clone(), participants.clone());

        let all = vanishing_contributions(&participants, &available);
        session.add_contribution(all[0]).unwrap();
        let err = session.add_contribution(all[0]).unwrap_err();
        assert_eq!(err, MpcError::DuplicateContributor(1));

        // The remaining peers can still complete the gate.
        for contribution in all.iter().skip(1) {
            session.add_contribution(*contribution).unwrap();
        }
        assert!(session.decide().unwrap().available);
    }

    #[test]
    fn unknown_participant_rejected() {
        let available = BTreeSet::from([1]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session = make_session(available.clone(), participants);

        let wide_participants: Vec<u32> = (1..=10).collect();
        let stray = real_contributions(1, &wide_participants, &available).pop().unwrap();
        assert_eq!(session.add_contribution(stray).unwrap_err(), MpcError::UnknownParticipant(10));
    }

    #[test]
    fn expired_session_decides_unavailable() {
        let available = BTreeSet::from([1, 2, 3]);
        let participants: Vec<u32> = (1..=7).collect();
        let mut session =
            MembershipSession::new("session-1".into(), 0, available.clone(), participants.clone(), 7, Duration::ZERO)
                .unwrap();

        let contribution = real_contributions(1, &participants, &available)[0];
        assert_eq!(session.add_contribution(contribution).unwrap_err(), MpcError::SessionTimeout);

        let result = session.decide().unwrap();
        assert!(!result.available);
        assert_eq!(result.reason, Some(DecisionReason::SessionTimeout));
    }

    #[test]
    fn out_of_range_availability_set_rejected() {
        let result = MembershipSession::new(
            "session-1".into(),
            0,
            BTreeSet::from([0, 1]),
            vec![1, 2],
            7,
            DEFAULT_SESSION_TIMEOUT,
        );
        assert_eq!(result.unwrap_err(), MpcError::OutOfRange);
    }
}

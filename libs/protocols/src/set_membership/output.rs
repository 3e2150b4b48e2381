//! Gate aggregation.

use super::contribution::{validate_available_indices, Contribution};
use crate::errors::MpcError;
use basic_types::Jar;
use math_lib::FieldElement;
use std::collections::BTreeSet;

/// The decision produced by one set membership gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityResult {
    /// Whether the gate sum vanished.
    pub available: bool,

    /// How many validators contributed to the decision.
    pub participating_validators: usize,

    /// Why the gate reported unavailable for a protocol reason rather than
    /// the aggregated sum.
    pub reason: Option<DecisionReason>,
}

impl AvailabilityResult {
    pub(crate) fn unavailable(participating_validators: usize, reason: DecisionReason) -> Self {
        Self { available: false, participating_validators, reason: Some(reason) }
    }
}

/// A protocol level reason for an unavailable decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Fewer contributions than the reconstruction threshold arrived.
    InsufficientContributions,

    /// The session expired before a decision could be made.
    SessionTimeout,
}

/// Aggregates gate contributions into an availability decision.
///
/// `H = Σᵢ cᵢ` over the weighted gate products; the gate decides available
/// iff `H == 0` and at least the reconstruction threshold contributed. The
/// decision depends only on the set of `(x, cᵢ)` pairs, never the order
/// they arrived in. Fewer contributions than the threshold always yield
/// unavailable: the protocol is biased toward denying a sale over leaking a
/// key for a line nobody quotes.
///
/// The sum is the at-zero interpolation of the product polynomial over
/// however many abscissas contributed; it is only faithful to that
/// polynomial while the availability set stays small relative to the
/// threshold.
pub fn check_availability(
    contributions: &[Contribution],
    available: &BTreeSet<u32>,
    threshold: usize,
) -> Result<AvailabilityResult, MpcError> {
    validate_available_indices(available)?;
    let mut jar = Jar::new(contributions.len());
    for contribution in contributions {
        jar.add_element(contribution.x, contribution.value)
            .map_err(|_| MpcError::DuplicateContributor(contribution.x))?;
    }

    let participating = jar.len();
    if participating < threshold {
        return Ok(AvailabilityResult::unavailable(participating, DecisionReason::InsufficientContributions));
    }

    let mut sum = FieldElement::ZERO;
    for (_, value) in jar.into_elements() {
        sum = sum + &value;
    }
    Ok(AvailabilityResult { available: sum.is_zero(), participating_validators: participating, reason: None })
}

#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_membership::{compute_local_contribution, eval_gate_polynomial, weigh_share};
    use math_lib::lagrange::Lagrange;
    use shamir_sharing::{generate_signal_index_shares, Share};

    /// Builds one share per participant whose weighted gate products sum to
    /// zero. The closing abscissa must lie outside the availability set so
    /// its gate factor is invertible.
    fn shares_with_vanishing_sum(participants: &[u32], available: &BTreeSet<u32>) -> Vec<Share> {
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
        assert!(!available.contains(&closing), "closing abscissa must be off the gate's roots");
        let gate = eval_gate_polynomial(&FieldElement::from_u32(closing), available).unwrap();
        let factor = *lagrange.coefficient(closing).unwrap() * &gate;
        let y = -sum * &factor.inv().unwrap();
        shares.push(Share { x: closing, y });
        shares
    }

    fn contributions(shares: &[Share], participants: &[u32], available: &BTreeSet<u32>) -> Vec<Contribution> {
        shares.iter().map(|share| compute_local_contribution(share, participants, available).unwrap()).collect()
    }

    #[test]
    fn vanishing_sum_decides_available() {
        let participants: Vec<u32> = (1..=7).collect();
        let available = BTreeSet::from([1, 3, 5]);
        let shares = shares_with_vanishing_sum(&participants, &available);

        let result =
            check_availability(&contributions(&shares, &participants, &available), &available, 7).unwrap();
        assert!(result.available);
        assert_eq!(result.participating_validators, 7);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn nonzero_sum_decides_unavailable() {
        let participants: Vec<u32> = (1..=7).collect();
        let available = BTreeSet::from([1, 2, 3, 4]);
        let shares = generate_signal_index_shares(5).unwrap();

        let result = check_availability(
            &contributions(&shares[0..7], &participants, &available),
            &available,
            7,
        )
        .unwrap();
        assert!(!result.available);
        assert_eq!(result.participating_validators, 7);
    }

    #[test]
    fn decision_is_order_independent() {
        let participants: Vec<u32> = (1..=7).collect();
        let available = BTreeSet::from([2, 4]);
        let shares = shares_with_vanishing_sum(&participants, &available);

        let mut reversed = contributions(&shares, &participants, &available);
        reversed.reverse();
        let result = check_availability(&reversed, &available, 7).unwrap();
        assert!(result.available);
    }

    #[test]
    fn more_than_threshold_validators() {
        let participants: Vec<u32> = (1..=9).collect();
        let available = BTreeSet::from([1, 4, 7]);
        let shares = shares_with_vanishing_sum(&participants, &available);

        let result =
            check_availability(&contributions(&shares, &participants, &available), &available, 7).unwrap();
        assert!(result.available);
        assert_eq!(result.participating_validators, 9);
    }

    #[test]
    fn under_threshold_is_unavailable_even_with_vanishing_sum() {
        let participants: Vec<u32> = (1..=5).collect();
        let available = BTreeSet::from([1, 2, 3]);
        let shares = shares_with_vanishing_sum(&participants, &available);

        let result =
            check_availability(&contributions(&shares, &participants, &available), &available, 7).unwrap();
        assert!(!result.available);
        assert_eq!(result.participating_validators, 5);
        assert_eq!(result.reason, Some(DecisionReason::InsufficientContributions));
    }

    #[test]
    fn duplicate_contributor_rejected() {
        let participants: Vec<u32> = (1..=7).collect();
        let available = BTreeSet::from([2]);
        let shares = generate_signal_index_shares(2).unwrap();
        let mut submitted = contributions(&shares[0..7], &participants, &available);
        submitted.push(submitted[0]);

        let result = check_availability(&submitted, &available, 7);
        assert_eq!(result.unwrap_err(), MpcError::DuplicateContributor(1));
    }

    #[test]
    fn out_of_range_availability_set_rejected() {
        let result = check_availability(&[], &BTreeSet::from([0]), 7);
        assert_eq!(result.unwrap_err(), MpcError::OutOfRange);
    }

    #[test]
    fn available_abscissas_contribute_zero_terms() {
        // Participants sitting on gate roots add nothing to the sum, so the
        // closing share alone determines whether it vanishes.
        let participants: Vec<u32> = (1..=7).collect();
        let available = BTreeSet::from([1, 2, 3, 4, 5, 6]);
        let shares = shares_with_vanishing_sum(&participants, &available);

        let submitted = contributions(&shares, &participants, &available);
        for contribution in &submitted[0..6] {
            assert_eq!(contribution.value, FieldElement::ZERO);
        }
        // With every other term zero, the solved closing share must be zero
        // too for the sum to vanish.
        let closing = weigh_share(&shares[6], &participants).unwrap()
            * &eval_gate_polynomial(&FieldElement::from_u32(7), &available).unwrap();
        assert_eq!(closing, FieldElement::ZERO);
        assert!(check_availability(&submitted, &available, 7).unwrap().available);
    }
}

//! Per-validator contribution to a set membership gate.

use crate::errors::MpcError;
use math_lib::{lagrange::Lagrange, FieldElement};
use shamir_sharing::{Share, SHARE_COUNT};
use std::collections::BTreeSet;

/// A validator's published contribution `cᵢ = λᵢ(0) · yᵢ · g(xᵢ)`.
///
/// On the wire the weighted share `λᵢ(0)·yᵢ` and the public gate evaluation
/// `g(xᵢ)` travel as separate values; the receiver multiplies them back into
/// the single product before aggregation. Publishing the product reveals
/// nothing on its own: `λᵢ` and `g(xᵢ)` are public and `yᵢ` is uniformly
/// random outside the holder's own shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    /// The contributor's share abscissa.
    pub x: u32,

    /// The weighted gate product.
    pub value: FieldElement,
}

pub(crate) fn validate_available_indices(available: &BTreeSet<u32>) -> Result<(), MpcError> {
    if available.is_empty() || available.iter().any(|a| !(1..=SHARE_COUNT).contains(a)) {
        return Err(MpcError::OutOfRange);
    }
    Ok(())
}

/// Evaluates the public gate polynomial `g(z) = Π_{a∈A} (z − a)` at `z`.
///
/// `g`'s roots are exactly the available indices, so `g(r) = 0` iff `r ∈ A`.
pub fn eval_gate_polynomial(z: &FieldElement, available: &BTreeSet<u32>) -> Result<FieldElement, MpcError> {
    validate_available_indices(available)?;
    let mut result = FieldElement::ONE;
    for a in available {
        result = result * &(*z - &FieldElement::from_u32(*a));
    }
    Ok(result)
}

/// Weighs a share by its Lagrange basis coefficient at zero, `λᵢ(0) · yᵢ`.
///
/// The basis is taken over the abscissas of all gate participants, which
/// every participant must agree on before contributing.
pub fn weigh_share(share: &Share, participants: &[u32]) -> Result<FieldElement, MpcError> {
    let lagrange = Lagrange::new(participants).map_err(|e| match e {
        math_lib::InterpolationError::DuplicateAbscissa(x) => MpcError::DuplicateContributor(x),
        _ => MpcError::UnknownParticipant(share.x),
    })?;
    lagrange.partial(share.x, &share.y).map_err(|_| MpcError::UnknownParticipant(share.x))
}

/// Computes this validator's full contribution to a gate.
pub fn compute_local_contribution(
    share: &Share,
    participants: &[u32],
    available: &BTreeSet<u32>,
) -> Result<Contribution, MpcError> {
    let weighted = weigh_share(share, participants)?;
    let gate = eval_gate_polynomial(&FieldElement::from_u32(share.x), available)?;
    Ok(Contribution { x: share.x, value: weighted * &gate })
}

//! Shamir splitting and reconstruction.

use crate::errors::ShamirError;
use math_lib::{lagrange, polynomial::Polynomial, FieldElement};

/// The number of shares every signal secret is split into.
pub const SHARE_COUNT: u32 = 10;

/// The number of shares required to reconstruct a signal secret.
pub const THRESHOLD: u32 = 7;

/// A single Shamir share: `(x, y)` where `y = f(x)` for a secret polynomial `f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Share {
    /// The evaluation point, in `{1..n}`.
    pub x: u32,

    /// The polynomial evaluation at `x`.
    pub y: FieldElement,
}

/// Splits a secret into `n` shares with reconstruction threshold `k`.
///
/// Polynomial coefficients above the constant term are sampled from a
/// cryptographically strong source. The returned shares are ordered by
/// ascending `x`, with `{x} = {1..n}`.
pub fn split(secret: &FieldElement, n: u32, k: u32) -> Result<Vec<Share>, ShamirError> {
    if k < 1 || n < k {
        return Err(ShamirError::BadParams);
    }
    let mut polynomial = Polynomial::default();
    polynomial.add_coefficient(*secret);
    let mut rng = rand::thread_rng();
    for _ in 1..k {
        polynomial.add_coefficient(FieldElement::gen_random_with_rng(&mut rng));
    }

    let mut shares = Vec::with_capacity(n as usize);
    for x in 1..=n {
        let y = polynomial.eval_at(&FieldElement::from_u32(x));
        shares.push(Share { x, y });
    }
    Ok(shares)
}

/// Splits a raw integer secret, failing if it is not below the field modulus.
pub fn split_value(secret: &[u8; 32], n: u32, k: u32) -> Result<Vec<Share>, ShamirError> {
    let secret = FieldElement::try_from_be_bytes(secret).map_err(|_| ShamirError::SecretOutOfRange)?;
    split(&secret, n, k)
}

/// Reconstructs `f(0)` from a set of distinct-`x` shares.
///
/// Any `k` or more shares from the same polynomial recover the secret, in
/// any order. Fewer than `k` shares yield a well defined but effectively
/// random field element; under-threshold detection is deliberately not
/// offered, as it would leak information about the secret.
pub fn reconstruct(shares: &[Share]) -> Result<FieldElement, ShamirError> {
    if shares.is_empty() {
        return Err(ShamirError::BadParams);
    }
    let points: Vec<(u32, FieldElement)> = shares.iter().map(|share| (share.x, share.y)).collect();
    lagrange::interpolate_at_zero(&points).map_err(|e| match e {
        math_lib::InterpolationError::DuplicateAbscissa(x) => ShamirError::DuplicateShare(x),
        _ => ShamirError::BadParams,
    })
}

/// Generates the ten validator shares of a signal's real index.
pub fn generate_signal_index_shares(real_index: u32) -> Result<Vec<Share>, ShamirError> {
    if !(1..=SHARE_COUNT).contains(&real_index) {
        return Err(ShamirError::IndexOutOfRange(real_index));
    }
    split(&FieldElement::from_u32(real_index), SHARE_COUNT, THRESHOLD)
}

#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(42)]
    #[case(15130512518)]
    fn split_and_reconstruct(#[case] secret: u64) {
        let secret = FieldElement::from_u64(secret);
        let shares = split(&secret, 10, 7).unwrap();
        assert_eq!(shares.len(), 10);

        // Any 7 share subset recovers the secret.
        assert_eq!(reconstruct(&shares[0..7]).unwrap(), secret);
        assert_eq!(reconstruct(&shares[3..10]).unwrap(), secret);
        // So does the full set.
        assert_eq!(reconstruct(&shares).unwrap(), secret);
    }

    #[test]
    fn random_secret_round_trips() {
        let secret = FieldElement::gen_random();
        let shares = split(&secret, 10, 7).unwrap();
        let mut subset = shares[2..9].to_vec();
        subset.reverse();
        assert_eq!(reconstruct(&subset).unwrap(), secret);
    }

    #[test]
    fn under_threshold_does_not_recover() {
        let secret = FieldElement::from_u64(42);
        let shares = split(&secret, 10, 7).unwrap();
        assert_ne!(reconstruct(&shares[0..6]).unwrap(), secret);
    }

    #[test]
    fn abscissas_are_one_to_n() {
        let shares = split(&FieldElement::from_u64(7), 10, 7).unwrap();
        let xs: Vec<u32> = shares.iter().map(|share| share.x).collect();
        assert_eq!(xs, (1..=10).collect::<Vec<u32>>());
    }

    #[rstest]
    #[case::zero_threshold(10, 0)]
    #[case::threshold_above_count(5, 6)]
    fn bad_params_rejected(#[case] n: u32, #[case] k: u32) {
        let result = split(&FieldElement::from_u64(1), n, k);
        assert_eq!(result.unwrap_err(), ShamirError::BadParams);
    }

    #[test]
    fn threshold_of_one_is_constant() {
        let secret = FieldElement::from_u64(9000);
        let shares = split(&secret, 3, 1).unwrap();
        for share in &shares {
            assert_eq!(share.y, secret);
        }
    }

    #[test]
    fn mixed_share_sources_rejected() {
        let shares_a = split(&FieldElement::from_u64(1), 10, 7).unwrap();
        let shares_b = split(&FieldElement::from_u64(2), 10, 7).unwrap();
        let mut mixed = shares_a[0..7].to_vec();
        mixed.push(shares_b[0]);
        assert_eq!(reconstruct(&mixed).unwrap_err(), ShamirError::DuplicateShare(1));
    }

    #[test]
    fn empty_reconstruction_rejected() {
        assert_eq!(reconstruct(&[]).unwrap_err(), ShamirError::BadParams);
    }

    #[test]
    fn secret_out_of_range_rejected() {
        // The field modulus itself is one past the largest valid secret.
        let modulus = {
            let mut bytes = [0u8; 32];
            hex::decode_to_slice("30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001", &mut bytes)
                .unwrap();
            bytes
        };
        assert_eq!(split_value(&modulus, 10, 7).unwrap_err(), ShamirError::SecretOutOfRange);
    }

    #[test]
    fn split_value_round_trips() {
        let mut secret = [0u8; 32];
        secret[31] = 42;
        let shares = split_value(&secret, 10, 7).unwrap();
        assert_eq!(reconstruct(&shares[0..7]).unwrap(), FieldElement::from_u64(42));
    }

    #[rstest]
    #[case(0)]
    #[case(11)]
    #[case(1000)]
    fn signal_index_out_of_range(#[case] index: u32) {
        let result = generate_signal_index_shares(index);
        assert_eq!(result.unwrap_err(), ShamirError::IndexOutOfRange(index));
    }

    #[test]
    fn every_signal_index_round_trips() {
        for real_index in 1..=10 {
            let shares = generate_signal_index_shares(real_index).unwrap();
            assert_eq!(shares.len(), 10);
            let recovered = reconstruct(&shares[0..7]).unwrap();
            assert_eq!(recovered, FieldElement::from_u32(real_index));
        }
    }
}

//! The field element type.

use crate::errors::FieldError;
use crypto_bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    rand_core::CryptoRngCore,
    Encoding, NonZero, RandomMod, U256,
};
use std::{
    fmt::{Debug, Display, Formatter},
    hash::Hash,
};

/// The BN254 scalar field prime, in decimal:
/// `21888242871839275222246405745257275088548364400416034343698204186575808495617`.
pub(crate) const MODULUS: U256 = U256::from_be_hex("30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001");

/// An element of the BN254 scalar field.
///
/// The value is kept as its canonical representative in `[0, p)`; every
/// operation reduces its output back into that range.
#[derive(Eq, PartialEq, Clone, Copy)]
pub struct FieldElement {
    pub(crate) value: U256,
}

impl FieldElement {
    /// The zero value.
    pub const ZERO: Self = FieldElement { value: U256::ZERO };

    /// The value one.
    pub const ONE: Self = FieldElement { value: U256::ONE };

    /// Constructs a field element, reducing the value if needed.
    pub fn new(value: U256) -> Self {
        let value = if value >= MODULUS {
            #[allow(clippy::expect_used)]
            let modulus = NonZero::new(MODULUS).expect("modulus is non zero");
            value.rem(&modulus)
        } else {
            value
        };
        Self { value }
    }

    /// Constructs a field element from a u32.
    pub fn from_u32(value: u32) -> Self {
        Self { value: U256::from(u64::from(value)) }
    }

    /// Constructs a field element from a u64.
    pub fn from_u64(value: u64) -> Self {
        Self { value: U256::from(value) }
    }

    /// Constructs a field element from big endian bytes, failing if the value is `>= p`.
    pub fn try_from_be_bytes(bytes: &[u8; 32]) -> Result<Self, FieldError> {
        let value = U256::from_be_slice(bytes);
        if value >= MODULUS {
            return Err(FieldError::OutOfRange);
        }
        Ok(Self { value })
    }

    /// The canonical big endian byte form of this element.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.value.to_be_bytes()
    }

    /// Generates a uniformly random field element.
    pub fn gen_random() -> Self {
        let mut rng = rand::thread_rng();
        Self::gen_random_with_rng(&mut rng)
    }

    /// Generates a uniformly random field element using the provided generator.
    pub fn gen_random_with_rng<R: CryptoRngCore>(rng: &mut R) -> Self {
        #[allow(clippy::expect_used)]
        let modulus = NonZero::new(MODULUS).expect("modulus is non zero");
        let value = U256::random_mod(rng, &modulus);
        Self { value }
    }

    /// Check if this element is zero.
    pub fn is_zero(&self) -> bool {
        self.value == U256::ZERO
    }

    /// Raises this element to the given exponent.
    pub fn pow(&self, exponent: &U256) -> Self {
        let value = self.as_residue().pow(exponent).retrieve();
        Self { value }
    }

    /// The multiplicative inverse of this element.
    ///
    /// Uses Fermat's little theorem, which holds because the modulus is prime.
    pub fn inv(&self) -> Result<Self, FieldError> {
        if self.is_zero() {
            return Err(FieldError::NoInverse);
        }
        let exponent = MODULUS.wrapping_sub(&U256::from(2u64));
        Ok(self.pow(&exponent))
    }

    /// Consume this element and return the canonical inner value.
    pub fn into_value(self) -> U256 {
        self.value
    }

    pub(crate) fn as_residue(&self) -> DynResidue<{ U256::LIMBS }> {
        DynResidue::new(&self.value, Self::residue_params())
    }

    pub(crate) fn residue_params() -> DynResidueParams<{ U256::LIMBS }> {
        DynResidueParams::new(&MODULUS)
    }
}

impl Default for FieldElement {
    fn default() -> Self {
        Self::ZERO
    }
}

// Note: comparisons are only meaningful on the canonical representative and
// are used in tests and ordering of share lists.
impl PartialOrd for FieldElement {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldElement {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for FieldElement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.to_be_bytes().hash(state)
    }
}

impl Debug for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({self})")
    }
}

impl Display for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", crate::encoding::encode_hex(self))
    }
}

impl From<u32> for FieldElement {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

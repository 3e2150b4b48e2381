//! Secret sharing errors.

use thiserror::Error;

/// An error while splitting or reconstructing a secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShamirError {
    /// The secret is not a canonical field representative.
    #[error("secret is not below the field modulus")]
    SecretOutOfRange,

    /// The share or threshold counts are inconsistent.
    #[error("invalid share parameters")]
    BadParams,

    /// A signal's real index must be one of the ten decoy positions.
    #[error("index must be in [1, 10], got {0}")]
    IndexOutOfRange(u32),

    /// Two shares with the same evaluation point were mixed.
    ///
    /// Shares with equal `x` but different `y` come from different
    /// polynomials and must never be combined.
    #[error("duplicate share for x = {0}")]
    DuplicateShare(u32),
}

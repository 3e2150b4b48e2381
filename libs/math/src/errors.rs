//! Field arithmetic errors.

use thiserror::Error;

/// An error during a field operation.
///
/// Both variants indicate a caller bug rather than a recoverable condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The element has no multiplicative inverse.
    #[error("element has no inverse")]
    NoInverse,

    /// The value is not a canonical field representative.
    #[error("value out of field range")]
    OutOfRange,
}

/// An error while decoding a field element from its wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input contained non-hex digits.
    #[error("invalid hex digits")]
    InvalidHex,

    /// The decoded integer is not in `[0, p)`.
    #[error("value out of field range")]
    OutOfRange,
}

/// An error during Lagrange interpolation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// Two points share an abscissa.
    #[error("duplicate abscissa {0}")]
    DuplicateAbscissa(u32),

    /// A point's abscissa is not part of the interpolation set.
    #[error("mismatched abscissas")]
    MismatchedAbscissas,
}

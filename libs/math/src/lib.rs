//! Arithmetic over the BN254 scalar field.
//!
//! Signals commit to their secret index inside the same field the protocol's
//! ZK circuits operate on, so shares produced here are directly usable
//! downstream without re-encoding.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::unimplemented,
    clippy::todo
)]

pub mod encoding;
pub mod errors;
pub mod lagrange;
pub mod modular;
pub mod polynomial;

pub use encoding::{decode_hex, encode_hex};
pub use errors::{DecodeError, FieldError, InterpolationError};
pub use modular::FieldElement;

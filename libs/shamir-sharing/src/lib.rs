//! Shamir secret sharing over the BN254 scalar field.
//!
//! Signal secrets are split ten ways with a seven share reconstruction
//! threshold; both the signal's encryption key and its real index among the
//! decoys travel through this crate.

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

pub mod errors;
pub mod party;
pub mod shamir;

pub use errors::ShamirError;
pub use party::ValidatorMapper;
pub use shamir::{generate_signal_index_shares, reconstruct, split, split_value, Share, SHARE_COUNT, THRESHOLD};

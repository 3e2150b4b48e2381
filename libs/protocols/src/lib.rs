//! Multi-party protocols run between the validators of the oracle network.

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
pub mod sessions;
pub mod set_membership;

pub use errors::MpcError;

//! The miner node.
//!
//! Miners answer validator availability checks against live sportsbook
//! quotes, respond to health pings, and submit session proofs for the
//! queries they served.

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
#![allow(clippy::module_inception)]

pub mod builder;
pub mod controllers;
pub mod observability;
pub mod services;

//! The set membership gate.
//!
//! Validators each hold a Shamir share of a signal's real index
//! `r ∈ {1..10}`. Given a public set `A` of miner-reported available line
//! indices, one gate decides whether `r ∈ A` without ever reconstructing `r`:
//!
//! 1. The gate polynomial `g(z) = Π_{a∈A} (z − a)` is public and satisfies
//!    `g(r) = 0` iff `r ∈ A`.
//! 2. Each participant evaluates `g` at its own abscissa and publishes the
//!    single product `cᵢ = λᵢ(0) · yᵢ · g(xᵢ)`, where `λᵢ(0)` is the
//!    Lagrange basis at zero for the participating abscissa set. One
//!    product reveals nothing: `λᵢ` and `g(xᵢ)` are public and `yᵢ` is
//!    uniformly random outside the attacker's own shares.
//! 3. The aggregator sums the products into `H = Σᵢ cᵢ` and never combines
//!    the weighted shares any other way. The line is available iff `H` is
//!    zero and at least the reconstruction threshold contributed.

mod contribution;
mod output;
mod state;

pub use contribution::{compute_local_contribution, eval_gate_polynomial, weigh_share, Contribution};
pub use output::{check_availability, AvailabilityResult, DecisionReason};
pub use state::{states, MembershipSession, SessionState};

/// How long a session waits for peer contributions before expiring.
pub const DEFAULT_SESSION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

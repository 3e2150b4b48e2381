//! MPC protocol errors.

use thiserror::Error;

/// An error during the set membership protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MpcError {
    /// A peer submitted a second contribution for the same evaluation point.
    #[error("duplicate contribution for x = {0}")]
    DuplicateContributor(u32),

    /// A value on the wire is not a canonical field representative, or an
    /// index is outside the decoy range.
    #[error("value out of range")]
    OutOfRange,

    /// A session with this id already exists.
    #[error("session {0} already exists")]
    DuplicateSession(String),

    /// Fewer contributions than the reconstruction threshold arrived.
    #[error("insufficient contributions: got {got}, need {need}")]
    InsufficientContributions {
        /// How many valid contributions arrived.
        got: usize,
        /// The reconstruction threshold.
        need: usize,
    },

    /// The session expired before enough contributions arrived.
    #[error("session timed out")]
    SessionTimeout,

    /// A contributor is not part of the session's participant set.
    #[error("unknown participant x = {0}")]
    UnknownParticipant(u32),

    /// The session table is not tracking this session.
    #[error("unknown session {0}")]
    UnknownSession(String),
}

//! Rejection reasons returned by game validators.

use thiserror::Error;

use crate::engine::models::GamePhase;

/// Why a move was rejected. Validators return these as values; the state they
/// were checked against is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The move type is not legal in the current phase.
    #[error("{move_type} is not allowed during the {phase} phase")]
    WrongPhase {
        move_type: &'static str,
        phase: GamePhase,
    },

    /// A referenced card, piece, or position does not exist or is out of range.
    #[error("{0}")]
    Precondition(String),

    /// A configuration value failed its field-specific validation.
    #[error("invalid config: {0}")]
    Config(String),

    /// The state does not allow this move, e.g. resuming with no snapshot.
    #[error("{0}")]
    InvalidState(String),

    #[error("unknown move type")]
    UnknownMove,

    /// The move could not be decoded at all.
    #[error("malformed move: {0}")]
    Malformed(String),
}

impl MoveError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        MoveError::Precondition(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        MoveError::Config(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        MoveError::InvalidState(msg.into())
    }
}

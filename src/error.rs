//! Error types for the engine boundary.
//!
//! Internal invariant violations (bitboard/mailbox desync, illegal king
//! capture, undo-stack underflow) are not represented here: they are bugs,
//! and the affected code panics rather than limping on in a corrupt state.

use thiserror::Error;

/// Errors surfaced to the driver across the engine boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A FEN string could not be parsed. The previous position is left
    /// untouched.
    #[error("malformed position: {0}")]
    MalformedPosition(String),

    /// The driver supplied a coordinate move that is not legal in the
    /// current position. The position is left untouched.
    #[error("illegal coordinate move: {0}")]
    IllegalCoordinateMove(String),
}

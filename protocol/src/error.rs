//! Protocol error types

use thiserror::Error;

/// A message failed validation and must be discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid magic cookie: {0:#010x}")]
    InvalidMagicCookie(u32),

    #[error("Invalid message type: expected {expected:#04x}, got {actual:#04x}")]
    InvalidMessageType { expected: u8, actual: u8 },

    #[error("Invalid message length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid decision bytes: {0:?}")]
    InvalidDecision([u8; 5]),

    #[error("Invalid card encoding: {0:?}")]
    InvalidCard([u8; 3]),

    #[error("Invalid round count: {0}")]
    InvalidRoundCount(u8),

    #[error("Invalid result code: {0}")]
    InvalidResult(u8),
}

/// Game engine invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Deck exhausted: no cards left to draw")]
    DeckExhausted,
}

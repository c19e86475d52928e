use std::time::Duration;

use thiserror::Error;

/// Malformed or type-mismatched wire bytes. Always fatal for the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("truncated datagram: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("unknown message kind discriminator {0:#04x}")]
    UnknownKind(u8),
    #[error("expected a {expected} message, received a {actual} message")]
    UnexpectedKind { expected: &'static str, actual: &'static str },
    #[error("invalid connection id length {0}")]
    InvalidConnectionIdLength(u8),
    #[error("connection id is required but missing")]
    MissingConnectionId,
    #[error("invalid value {0} for the 'finished' flag")]
    InvalidFinishedFlag(u8),
    #[error("{0} trailing bytes after the end of the message")]
    TrailingBytes(usize),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout { waiting_for: &'static str, after: Duration },
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("received ack for packet {actual}, expected ack for packet {expected}")]
    UnexpectedAck { expected: u64, actual: u64 },
    #[error("lockstep sender is {actual}, operation requires {expected}")]
    InvalidState { expected: &'static str, actual: &'static str },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TransferError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }

    /// Re-labels a timeout with what the caller was actually waiting for. Other errors pass
    ///  through unchanged.
    pub fn waiting_for(self, what: &'static str) -> TransferError {
        match self {
            TransferError::Timeout { after, .. } => TransferError::Timeout { waiting_for: what, after },
            other => other,
        }
    }
}

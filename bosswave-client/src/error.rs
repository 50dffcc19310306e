//! Client error types.

use bosswave_protocol::Command;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] bosswave_protocol::ProtocolError),

    #[error("protocol violation: expected helo, router sent {command}")]
    ProtocolViolation { command: Command },

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("router error: {status} - {reason}")]
    Server { status: String, reason: String },

    #[error("frame is missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid entity file: {0}")]
    Entity(String),
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }
}

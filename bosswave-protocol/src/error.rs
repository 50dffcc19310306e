//! Protocol error types.

use thiserror::Error;

/// Errors raised while parsing payload type descriptor text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("malformed payload type: {0:?}")]
    Malformed(String),

    #[error("octet must contain four elements, got {0}")]
    OctetLength(usize),

    #[error("invalid octet element: {0:?}")]
    OctetElement(String),

    #[error("invalid payload type number: {0:?}")]
    InvalidNumber(String),

    #[error("payload type number must be between 0 and 99, got {0}")]
    NumberOutOfRange(u64),
}

/// Protocol-level errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("unknown command code: {0:?}")]
    UnknownCommand(String),

    #[error("invalid item header: {0}")]
    InvalidItemHeader(String),

    #[error("invalid payload object type: {0}")]
    InvalidPayloadType(#[from] FormatError),

    #[error("invalid key-value key: {0:?}")]
    InvalidKey(String),

    #[error("routing object number out of range: {0}")]
    InvalidRoutingObjectNumber(u32),

    #[error("item body not followed by newline (got {0:#04x})")]
    MissingTerminator(u8),

    #[error("item too large: {size} bytes (max {max})")]
    ItemTooLarge { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns whether this error describes malformed frame contents, as
    /// opposed to a failure of the underlying transport.
    pub fn is_invalid_frame(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }

    /// Returns the underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            ProtocolError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

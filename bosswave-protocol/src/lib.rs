//! # bosswave-protocol
//!
//! Wire protocol implementation for Bosswave.
//!
//! This crate provides:
//! - The command catalog and its 4-character wire codes
//! - Payload object type descriptors (`a.b.c.d:`, `:NN`, `a.b.c.d:N`)
//! - Key-value pairs, routing objects and payload objects
//! - Frame construction, encoding and async decoding
//! - Sequence number sources

pub mod codec;
pub mod command;
pub mod error;
pub mod frame;
pub mod item;
pub mod po_type;
pub mod po_types;
pub mod sequence;

pub use codec::{read_frame, skip_to_terminator, write_frame};
pub use command::Command;
pub use error::{FormatError, ProtocolError};
pub use frame::{Frame, FrameBuilder, FRAME_HEADER_SIZE};
pub use item::{KvPair, PayloadObject, RoutingObject};
pub use po_type::PayloadType;
pub use sequence::{CounterSequence, RandomSequence, SequenceSource};

/// Default port the local router listens on.
pub const DEFAULT_PORT: u16 = 28589;

/// Maximum body size of a single frame item (64 MiB).
pub const MAX_ITEM_SIZE: usize = 64 * 1024 * 1024;

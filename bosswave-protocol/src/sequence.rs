//! Sequence number sources.
//!
//! Every outgoing request carries a sequence number that the router echoes
//! in its `resp` and `rslt` frames. Numbers only need to be unique among
//! requests that are outstanding at the same time, so the default source
//! draws random 31-bit values. A counter source is provided for tests and
//! for callers that want reproducible numbering.

use std::sync::atomic::{AtomicU32, Ordering};

/// Mask keeping sequence numbers within the non-negative 31-bit range.
pub const SEQUENCE_MASK: u32 = 0x7FFF_FFFF;

/// A source of sequence numbers, shared by every request on a connection.
pub trait SequenceSource: Send + Sync {
    /// Returns the next sequence number.
    fn next_seq(&self) -> u32;
}

/// Random sequence numbers masked to 31 bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSequence;

impl SequenceSource for RandomSequence {
    fn next_seq(&self) -> u32 {
        rand::random::<u32>() & SEQUENCE_MASK
    }
}

/// Monotonically increasing sequence numbers, wrapping within 31 bits.
#[derive(Debug)]
pub struct CounterSequence {
    next: AtomicU32,
}

impl CounterSequence {
    pub fn new(start: u32) -> Self {
        Self {
            next: AtomicU32::new(start & SEQUENCE_MASK),
        }
    }
}

impl Default for CounterSequence {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SequenceSource for CounterSequence {
    fn next_seq(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK
    }
}

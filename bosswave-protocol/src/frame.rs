//! Bosswave frame format.
//!
//! A frame is a fixed-width header line, any number of items, and a
//! terminator line:
//!
//! ```text
//! CCCC 0000000000 SSSSSSSSSS\n     command, reserved field, sequence number
//! kv <key> <len>\n<body>\n         zero or more key-value pairs
//! ro <num> <len>\n<body>\n         zero or more routing objects
//! po <type> <len>\n<body>\n        zero or more payload objects
//! end\n
//! ```
//!
//! The reserved 10-digit field is always written as zeros and ignored on
//! read beyond checking that it is a non-negative integer.

use crate::command::Command;
use crate::item::{KvPair, PayloadObject, RoutingObject};
use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;

/// Size of the fixed frame header in bytes (4+1+10+1+10+1 = 27).
pub const FRAME_HEADER_SIZE: usize = 27;

/// Terminator line closing every frame.
pub const FRAME_TERMINATOR: &[u8] = b"end\n";

/// An immutable protocol frame. Build one with [`Frame::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    seq_no: u32,
    kv_pairs: Vec<KvPair>,
    routing_objects: Vec<RoutingObject>,
    payload_objects: Vec<PayloadObject>,
}

impl Frame {
    /// Starts building a frame for `command` with sequence number `seq_no`.
    pub fn builder(command: Command, seq_no: u32) -> FrameBuilder {
        FrameBuilder {
            frame: Frame {
                command,
                seq_no,
                kv_pairs: Vec::new(),
                routing_objects: Vec::new(),
                payload_objects: Vec::new(),
            },
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn seq_no(&self) -> u32 {
        self.seq_no
    }

    pub fn kv_pairs(&self) -> &[KvPair] {
        &self.kv_pairs
    }

    pub fn routing_objects(&self) -> &[RoutingObject] {
        &self.routing_objects
    }

    pub fn payload_objects(&self) -> &[PayloadObject] {
        &self.payload_objects
    }

    /// Returns the value of the earliest pair with the given key.
    pub fn first_value(&self, key: &str) -> Option<&Bytes> {
        self.kv_pairs
            .iter()
            .find(|kv| kv.key() == key)
            .map(KvPair::value)
    }

    /// Like [`first_value`](Self::first_value), decoded as (lossy) UTF-8.
    pub fn first_value_str(&self, key: &str) -> Option<Cow<'_, str>> {
        self.first_value(key).map(|v| String::from_utf8_lossy(v))
    }

    /// Returns all values for the given key, in order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Bytes> + 'a {
        self.kv_pairs
            .iter()
            .filter(move |kv| kv.key() == key)
            .map(KvPair::value)
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.encoded_len_hint());

        buf.put_slice(
            format!("{} {:010} {:010}\n", self.command.code(), 0, self.seq_no).as_bytes(),
        );

        for kv in &self.kv_pairs {
            kv.encode_into(&mut buf);
        }
        for ro in &self.routing_objects {
            ro.encode_into(&mut buf);
        }
        for po in &self.payload_objects {
            po.encode_into(&mut buf);
        }

        buf.put_slice(FRAME_TERMINATOR);
        buf
    }

    fn encoded_len_hint(&self) -> usize {
        // Item header lines are short; 32 bytes covers tag, identifier and length.
        let items = self.kv_pairs.iter().map(|kv| kv.key().len() + kv.value().len() + 32);
        let ros = self.routing_objects.iter().map(|ro| ro.content().len() + 32);
        let pos = self.payload_objects.iter().map(|po| po.content().len() + 48);
        FRAME_HEADER_SIZE + FRAME_TERMINATOR.len() + items.chain(ros).chain(pos).sum::<usize>()
    }
}

/// Builder for [`Frame`].
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    frame: Frame,
}

impl FrameBuilder {
    pub fn command(mut self, command: Command) -> Self {
        self.frame.command = command;
        self
    }

    /// Appends a key-value pair. The key is not checked, see [`KvPair`].
    pub fn kv(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.frame.kv_pairs.push(KvPair::new(key, value));
        self
    }

    pub fn kv_pair(mut self, pair: KvPair) -> Self {
        self.frame.kv_pairs.push(pair);
        self
    }

    pub fn routing_object(mut self, ro: RoutingObject) -> Self {
        self.frame.routing_objects.push(ro);
        self
    }

    pub fn routing_objects(mut self, ros: impl IntoIterator<Item = RoutingObject>) -> Self {
        self.frame.routing_objects.extend(ros);
        self
    }

    pub fn payload_object(mut self, po: PayloadObject) -> Self {
        self.frame.payload_objects.push(po);
        self
    }

    pub fn payload_objects(mut self, pos: impl IntoIterator<Item = PayloadObject>) -> Self {
        self.frame.payload_objects.extend(pos);
        self
    }

    pub fn build(self) -> Frame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::po_type::PayloadType;

    #[test]
    fn test_encode_publish_example() {
        let frame = Frame::builder(Command::Publish, 410).kv("uri", "a/b").build();
        assert_eq!(
            &frame.encode()[..],
            b"publ 0000000000 0000000410\nkv uri 3\na/b\nend\n"
        );
    }

    #[test]
    fn test_encode_empty_frame() {
        let frame = Frame::builder(Command::Subscribe, 1840).build();
        assert_eq!(&frame.encode()[..], b"subs 0000000000 0000001840\nend\n");
    }

    #[test]
    fn test_encode_items_in_section_order() {
        // Payload objects added first still follow kv pairs and routing objects.
        let frame = Frame::builder(Command::Publish, 1600)
            .payload_object(PayloadObject::new(PayloadType::Number(42), "testPayload"))
            .routing_object(RoutingObject::new(1, "ro"))
            .kv("testKey1", "testValue1")
            .kv("testKey2", "testValue2")
            .build();

        let expected = "publ 0000000000 0000001600\n\
                        kv testKey1 10\ntestValue1\n\
                        kv testKey2 10\ntestValue2\n\
                        ro 1 2\nro\n\
                        po :42 11\ntestPayload\n\
                        end\n";
        assert_eq!(&frame.encode()[..], expected.as_bytes());
    }

    #[test]
    fn test_header_width() {
        let frame = Frame::builder(Command::Result, u32::MAX).build();
        let encoded = frame.encode();
        assert_eq!(&encoded[..FRAME_HEADER_SIZE], b"rslt 0000000000 4294967295\n");
    }

    #[test]
    fn test_first_value_wins() {
        let frame = Frame::builder(Command::Publish, 410)
            .kv("k", "v1")
            .kv("other", "x")
            .kv("k", "v2")
            .build();

        assert_eq!(frame.first_value("k").unwrap().as_ref(), b"v1");
        assert_eq!(frame.first_value_str("k").unwrap(), "v1");
        assert!(frame.first_value("missing").is_none());

        let all: Vec<_> = frame.values("k").map(|v| v.to_vec()).collect();
        assert_eq!(all, vec![b"v1".to_vec(), b"v2".to_vec()]);
    }

    #[test]
    fn test_builder_command_override() {
        let frame = Frame::builder(Command::Publish, 1)
            .command(Command::Persist)
            .build();
        assert_eq!(frame.command(), Command::Persist);
        assert_eq!(frame.seq_no(), 1);
    }
}

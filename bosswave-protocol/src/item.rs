//! Frame items: key-value pairs, routing objects and payload objects.
//!
//! Each item is written as a header line followed by its raw body and a
//! single newline:
//!
//! ```text
//! kv <key> <len>\n<body>\n
//! ro <num> <len>\n<body>\n
//! po <type> <len>\n<body>\n
//! ```

use crate::error::ProtocolError;
use crate::po_type::PayloadType;
use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use std::fmt::Display;

fn put_item(buf: &mut BytesMut, tag: &str, ident: impl Display, body: &[u8]) {
    let header = format!("{} {} {}\n", tag, ident, body.len());
    buf.reserve(header.len() + body.len() + 1);
    buf.put_slice(header.as_bytes());
    buf.put_slice(body);
    buf.put_u8(b'\n');
}

/// A key-value pair. Values are arbitrary bytes.
///
/// Keys must be non-empty and free of spaces and newlines, otherwise the
/// encoded item header cannot be read back. [`KvPair::new`] does not check
/// this; use [`KvPair::try_new`] for keys that are not known to be valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    key: String,
    value: Bytes,
}

/// Returns whether `key` can appear in a `kv` item header.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.bytes().any(|b| b == b' ' || b == b'\n')
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a pair, rejecting keys that would corrupt the item header.
    pub fn try_new(key: impl Into<String>, value: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let key = key.into();
        if !is_valid_key(&key) {
            return Err(ProtocolError::InvalidKey(key));
        }
        Ok(Self::new(key, value))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns the value as text, replacing invalid UTF-8 sequences.
    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Appends the wire encoding of this pair to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        put_item(buf, "kv", &self.key, &self.value);
    }
}

/// A protocol-internal object (access chain, signature, ...) identified by
/// a number in `0..=255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingObject {
    number: u8,
    content: Bytes,
}

impl RoutingObject {
    pub fn new(number: u8, content: impl Into<Bytes>) -> Self {
        Self {
            number,
            content: content.into(),
        }
    }

    /// Creates a routing object from an unchecked number.
    pub fn try_new(number: u32, content: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let number =
            u8::try_from(number).map_err(|_| ProtocolError::InvalidRoutingObjectNumber(number))?;
        Ok(Self::new(number, content))
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        put_item(buf, "ro", self.number, &self.content);
    }
}

/// Application-level message content tagged with a type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadObject {
    po_type: PayloadType,
    content: Bytes,
}

impl PayloadObject {
    pub fn new(po_type: PayloadType, content: impl Into<Bytes>) -> Self {
        Self {
            po_type,
            content: content.into(),
        }
    }

    pub fn po_type(&self) -> PayloadType {
        self.po_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        put_item(buf, "po", self.po_type, &self.content);
    }
}

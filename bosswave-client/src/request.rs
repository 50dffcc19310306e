//! Request parameters and their frame encodings.
//!
//! Each request type is built with `new(required...)` followed by `with_*`
//! calls, and turned into a wire frame by `to_frame(seq_no)`. Optional
//! settings that are unset are omitted from the frame entirely.

use crate::message::bool_str;
use bosswave_protocol::{po_types, Command, Frame, FrameBuilder, PayloadObject, RoutingObject};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::time::Duration;

/// How much of a primary access chain the router should elaborate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChainElaborationLevel {
    /// Leave the choice to the router; nothing is sent.
    #[default]
    Unspecified,
    Partial,
    Full,
}

impl ChainElaborationLevel {
    /// Wire value, or `None` for [`Unspecified`](Self::Unspecified).
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            ChainElaborationLevel::Unspecified => None,
            ChainElaborationLevel::Partial => Some("partial"),
            ChainElaborationLevel::Full => Some("full"),
        }
    }
}

impl fmt::Display for ChainElaborationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("unspecified"))
    }
}

impl std::str::FromStr for ChainElaborationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "unspecified" => Ok(ChainElaborationLevel::Unspecified),
            "partial" => Ok(ChainElaborationLevel::Partial),
            "full" => Ok(ChainElaborationLevel::Full),
            other => Err(format!("unknown elaboration level: {}", other)),
        }
    }
}

fn format_expiry(expiry: &DateTime<Utc>) -> String {
    expiry.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_delta(delta: Duration) -> String {
    format!("{}ms", delta.as_millis())
}

/// Appends the optional `expiry` and `expiryDelta` pairs.
fn put_expiry(
    mut b: FrameBuilder,
    expiry: Option<&DateTime<Utc>>,
    delta: Option<Duration>,
) -> FrameBuilder {
    if let Some(expiry) = expiry {
        b = b.kv("expiry", format_expiry(expiry));
    }
    if let Some(delta) = delta {
        b = b.kv("expiryDelta", format_delta(delta));
    }
    b
}

fn put_opt(b: FrameBuilder, key: &str, value: Option<&str>) -> FrameBuilder {
    match value {
        Some(v) => b.kv(key, v.to_string()),
        None => b,
    }
}

fn put_elaboration(b: FrameBuilder, level: ChainElaborationLevel) -> FrameBuilder {
    put_opt(b, "elaborate_pac", level.as_str())
}

fn put_autochain(b: FrameBuilder, auto_chain: bool) -> FrameBuilder {
    if auto_chain {
        b.kv("autochain", "true")
    } else {
        b
    }
}

fn put_unpack(b: FrameBuilder, leave_packed: bool) -> FrameBuilder {
    if leave_packed {
        b
    } else {
        b.kv("unpack", "true")
    }
}

/// Publish (or persist) payload objects to a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub uri: String,
    pub persist: bool,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub primary_access_chain: Option<String>,
    pub do_verify: bool,
    pub elaboration: ChainElaborationLevel,
    pub auto_chain: bool,
    pub routing_objects: Vec<RoutingObject>,
    pub payload_objects: Vec<PayloadObject>,
}

impl PublishRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            persist: false,
            expiry: None,
            expiry_delta: None,
            primary_access_chain: None,
            do_verify: false,
            elaboration: ChainElaborationLevel::Unspecified,
            auto_chain: false,
            routing_objects: Vec::new(),
            payload_objects: Vec::new(),
        }
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_primary_access_chain(mut self, pac: impl Into<String>) -> Self {
        self.primary_access_chain = Some(pac.into());
        self
    }

    pub fn with_do_verify(mut self, do_verify: bool) -> Self {
        self.do_verify = do_verify;
        self
    }

    pub fn with_elaboration(mut self, level: ChainElaborationLevel) -> Self {
        self.elaboration = level;
        self
    }

    pub fn with_auto_chain(mut self, auto_chain: bool) -> Self {
        self.auto_chain = auto_chain;
        self
    }

    pub fn with_routing_object(mut self, ro: RoutingObject) -> Self {
        self.routing_objects.push(ro);
        self
    }

    pub fn with_payload_object(mut self, po: PayloadObject) -> Self {
        self.payload_objects.push(po);
        self
    }

    /// `pers` when persisting, `publ` otherwise.
    pub fn command(&self) -> Command {
        if self.persist {
            Command::Persist
        } else {
            Command::Publish
        }
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(self.command(), seq_no)
            .kv("uri", self.uri.clone())
            .kv("persist", bool_str(self.persist));
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        b = put_opt(b, "primary_access_chain", self.primary_access_chain.as_deref());
        b = b.kv("doverify", bool_str(self.do_verify));
        b = put_elaboration(b, self.elaboration);
        b = put_autochain(b, self.auto_chain);
        b.routing_objects(self.routing_objects.iter().cloned())
            .payload_objects(self.payload_objects.iter().cloned())
            .build()
    }
}

/// Subscribe to messages published on a URI pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub uri: String,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub primary_access_chain: Option<String>,
    pub do_verify: bool,
    pub elaboration: ChainElaborationLevel,
    pub auto_chain: bool,
    pub leave_packed: bool,
    pub routing_objects: Vec<RoutingObject>,
}

impl SubscribeRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            expiry: None,
            expiry_delta: None,
            primary_access_chain: None,
            do_verify: false,
            elaboration: ChainElaborationLevel::Unspecified,
            auto_chain: false,
            leave_packed: false,
            routing_objects: Vec::new(),
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_primary_access_chain(mut self, pac: impl Into<String>) -> Self {
        self.primary_access_chain = Some(pac.into());
        self
    }

    pub fn with_do_verify(mut self, do_verify: bool) -> Self {
        self.do_verify = do_verify;
        self
    }

    pub fn with_elaboration(mut self, level: ChainElaborationLevel) -> Self {
        self.elaboration = level;
        self
    }

    pub fn with_auto_chain(mut self, auto_chain: bool) -> Self {
        self.auto_chain = auto_chain;
        self
    }

    /// Ask the router not to unpack routing and payload objects.
    pub fn with_leave_packed(mut self, leave_packed: bool) -> Self {
        self.leave_packed = leave_packed;
        self
    }

    pub fn with_routing_object(mut self, ro: RoutingObject) -> Self {
        self.routing_objects.push(ro);
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::Subscribe, seq_no).kv("uri", self.uri.clone());
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        b = put_opt(b, "primary_access_chain", self.primary_access_chain.as_deref());
        b = b.kv("doverify", bool_str(self.do_verify));
        b = put_elaboration(b, self.elaboration);
        b = put_autochain(b, self.auto_chain);
        b = put_unpack(b, self.leave_packed);
        b.routing_objects(self.routing_objects.iter().cloned())
            .build()
    }
}

/// Query the messages persisted under a URI pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub uri: String,
    pub primary_access_chain: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub elaboration: ChainElaborationLevel,
    pub auto_chain: bool,
    pub leave_packed: bool,
    pub routing_objects: Vec<RoutingObject>,
}

impl QueryRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            primary_access_chain: None,
            expiry: None,
            expiry_delta: None,
            elaboration: ChainElaborationLevel::Unspecified,
            auto_chain: false,
            leave_packed: false,
            routing_objects: Vec::new(),
        }
    }

    pub fn with_primary_access_chain(mut self, pac: impl Into<String>) -> Self {
        self.primary_access_chain = Some(pac.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_elaboration(mut self, level: ChainElaborationLevel) -> Self {
        self.elaboration = level;
        self
    }

    pub fn with_auto_chain(mut self, auto_chain: bool) -> Self {
        self.auto_chain = auto_chain;
        self
    }

    pub fn with_leave_packed(mut self, leave_packed: bool) -> Self {
        self.leave_packed = leave_packed;
        self
    }

    pub fn with_routing_object(mut self, ro: RoutingObject) -> Self {
        self.routing_objects.push(ro);
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::Query, seq_no).kv("uri", self.uri.clone());
        b = put_opt(b, "primary_access_chain", self.primary_access_chain.as_deref());
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        b = put_elaboration(b, self.elaboration);
        b = put_autochain(b, self.auto_chain);
        b = put_unpack(b, self.leave_packed);
        b.routing_objects(self.routing_objects.iter().cloned())
            .build()
    }
}

/// List the children of a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub uri: String,
    pub primary_access_chain: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub elaboration: ChainElaborationLevel,
    pub auto_chain: bool,
    pub routing_objects: Vec<RoutingObject>,
}

impl ListRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            primary_access_chain: None,
            expiry: None,
            expiry_delta: None,
            elaboration: ChainElaborationLevel::Unspecified,
            auto_chain: false,
            routing_objects: Vec::new(),
        }
    }

    pub fn with_primary_access_chain(mut self, pac: impl Into<String>) -> Self {
        self.primary_access_chain = Some(pac.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_elaboration(mut self, level: ChainElaborationLevel) -> Self {
        self.elaboration = level;
        self
    }

    pub fn with_auto_chain(mut self, auto_chain: bool) -> Self {
        self.auto_chain = auto_chain;
        self
    }

    pub fn with_routing_object(mut self, ro: RoutingObject) -> Self {
        self.routing_objects.push(ro);
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::List, seq_no).kv("uri", self.uri.clone());
        b = put_opt(b, "primary_access_chain", self.primary_access_chain.as_deref());
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        b = put_elaboration(b, self.elaboration);
        b = put_autochain(b, self.auto_chain);
        b.routing_objects(self.routing_objects.iter().cloned())
            .build()
    }
}

/// Create a new entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeEntityRequest {
    pub contact: Option<String>,
    pub comment: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub revokers: Vec<String>,
    pub omit_creation_date: bool,
}

impl MakeEntityRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_revoker(mut self, revoker: impl Into<String>) -> Self {
        self.revokers.push(revoker.into());
        self
    }

    pub fn with_omit_creation_date(mut self, omit: bool) -> Self {
        self.omit_creation_date = omit;
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::MakeEntity, seq_no);
        b = put_opt(b, "contact", self.contact.as_deref());
        b = put_opt(b, "comment", self.comment.as_deref());
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        for revoker in &self.revokers {
            b = b.kv("revoker", revoker.clone());
        }
        b.kv("omitcreationdate", bool_str(self.omit_creation_date))
            .build()
    }
}

/// Create a delegation of trust (DOT) to another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeDotRequest {
    pub to: String,
    pub ttl: Option<u32>,
    pub is_permission: bool,
    pub expiry: Option<DateTime<Utc>>,
    pub expiry_delta: Option<Duration>,
    pub contact: Option<String>,
    pub comment: Option<String>,
    pub revokers: Vec<String>,
    pub omit_creation_date: bool,
    pub access_permissions: Option<String>,
    pub uri: Option<String>,
}

impl MakeDotRequest {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ttl: None,
            is_permission: false,
            expiry: None,
            expiry_delta: None,
            contact: None,
            comment: None,
            revokers: Vec::new(),
            omit_creation_date: false,
            access_permissions: None,
            uri: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_is_permission(mut self, is_permission: bool) -> Self {
        self.is_permission = is_permission;
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_expiry_delta(mut self, delta: Duration) -> Self {
        self.expiry_delta = Some(delta);
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_revoker(mut self, revoker: impl Into<String>) -> Self {
        self.revokers.push(revoker.into());
        self
    }

    pub fn with_omit_creation_date(mut self, omit: bool) -> Self {
        self.omit_creation_date = omit;
        self
    }

    /// Access permission string, e.g. `PC*`.
    pub fn with_access_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.access_permissions = Some(permissions.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::MakeDot, seq_no).kv("to", self.to.clone());
        if let Some(ttl) = self.ttl {
            b = b.kv("ttl", ttl.to_string());
        }
        b = b.kv("ispermission", bool_str(self.is_permission));
        b = put_expiry(b, self.expiry.as_ref(), self.expiry_delta);
        b = put_opt(b, "contact", self.contact.as_deref());
        b = put_opt(b, "comment", self.comment.as_deref());
        for revoker in &self.revokers {
            b = b.kv("revoker", revoker.clone());
        }
        b = b.kv("omitcreationdate", bool_str(self.omit_creation_date));
        b = put_opt(b, "accesspermissions", self.access_permissions.as_deref());
        b = put_opt(b, "uri", self.uri.as_deref());
        b.build()
    }
}

/// Assemble DOTs into a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeChainRequest {
    pub is_permission: bool,
    pub unelaborate: bool,
    pub dots: Vec<String>,
}

impl MakeChainRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_is_permission(mut self, is_permission: bool) -> Self {
        self.is_permission = is_permission;
        self
    }

    pub fn with_unelaborate(mut self, unelaborate: bool) -> Self {
        self.unelaborate = unelaborate;
        self
    }

    /// Appends a DOT hash; order is preserved on the wire.
    pub fn with_dot(mut self, dot: impl Into<String>) -> Self {
        self.dots.push(dot.into());
        self
    }

    pub fn to_frame(&self, seq_no: u32) -> Frame {
        let mut b = Frame::builder(Command::MakeChain, seq_no)
            .kv("ispermission", bool_str(self.is_permission))
            .kv("unelaborate", bool_str(self.unelaborate));
        for dot in &self.dots {
            b = b.kv("dot", dot.clone());
        }
        b.build()
    }
}

/// Frame installing `key` as the connection's entity.
pub fn set_entity_frame(key: Bytes, seq_no: u32) -> Frame {
    Frame::builder(Command::SetEntity, seq_no)
        .payload_object(PayloadObject::new(po_types::ENTITY_SECRET.po_type(), key))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosswave_protocol::PayloadType;
    use chrono::TimeZone;

    fn keys(frame: &Frame) -> Vec<&str> {
        frame.kv_pairs().iter().map(|kv| kv.key()).collect()
    }

    fn value(frame: &Frame, key: &str) -> String {
        frame.first_value_str(key).unwrap().into_owned()
    }

    #[test]
    fn test_elaboration_level() {
        assert_eq!(ChainElaborationLevel::default(), ChainElaborationLevel::Unspecified);
        assert_eq!(ChainElaborationLevel::Unspecified.as_str(), None);
        assert_eq!(ChainElaborationLevel::Full.as_str(), Some("full"));
        assert_eq!(
            "partial".parse::<ChainElaborationLevel>().unwrap(),
            ChainElaborationLevel::Partial
        );
        assert!("none".parse::<ChainElaborationLevel>().is_err());
    }

    #[test]
    fn test_publish_minimal() {
        let frame = PublishRequest::new("a/b").to_frame(410);

        assert_eq!(frame.command(), Command::Publish);
        assert_eq!(frame.seq_no(), 410);
        assert_eq!(keys(&frame), vec!["uri", "persist", "doverify"]);
        assert_eq!(value(&frame, "persist"), "false");
        assert_eq!(value(&frame, "doverify"), "false");
    }

    #[test]
    fn test_publish_full() {
        let expiry = Utc.with_ymd_and_hms(2017, 3, 4, 5, 6, 7).unwrap();
        let po = PayloadObject::new(PayloadType::Octet([64, 0, 0, 0]), "hi");
        let frame = PublishRequest::new("a/b")
            .with_persist(true)
            .with_expiry(expiry)
            .with_expiry_delta(Duration::from_secs(5))
            .with_primary_access_chain("pac")
            .with_do_verify(true)
            .with_elaboration(ChainElaborationLevel::Full)
            .with_auto_chain(true)
            .with_routing_object(RoutingObject::new(2, "ro"))
            .with_payload_object(po.clone())
            .to_frame(1);

        assert_eq!(frame.command(), Command::Persist);
        assert_eq!(
            keys(&frame),
            vec![
                "uri",
                "persist",
                "expiry",
                "expiryDelta",
                "primary_access_chain",
                "doverify",
                "elaborate_pac",
                "autochain"
            ]
        );
        assert_eq!(value(&frame, "persist"), "true");
        assert_eq!(value(&frame, "expiry"), "2017-03-04T05:06:07Z");
        assert_eq!(value(&frame, "expiryDelta"), "5000ms");
        assert_eq!(value(&frame, "elaborate_pac"), "full");
        assert_eq!(value(&frame, "autochain"), "true");
        assert_eq!(frame.routing_objects().len(), 1);
        assert_eq!(frame.payload_objects(), &[po]);
    }

    #[test]
    fn test_subscribe_unpack() {
        let frame = SubscribeRequest::new("a/*").to_frame(2);
        assert_eq!(frame.command(), Command::Subscribe);
        assert_eq!(keys(&frame), vec!["uri", "doverify", "unpack"]);
        assert_eq!(value(&frame, "unpack"), "true");

        let frame = SubscribeRequest::new("a/*").with_leave_packed(true).to_frame(2);
        assert!(frame.first_value("unpack").is_none());
    }

    #[test]
    fn test_query_frame() {
        let frame = QueryRequest::new("a/+")
            .with_primary_access_chain("pac")
            .with_elaboration(ChainElaborationLevel::Partial)
            .to_frame(3);

        assert_eq!(frame.command(), Command::Query);
        assert_eq!(
            keys(&frame),
            vec!["uri", "primary_access_chain", "elaborate_pac", "unpack"]
        );
        assert_eq!(value(&frame, "elaborate_pac"), "partial");
    }

    #[test]
    fn test_list_frame() {
        let frame = ListRequest::new("a/")
            .with_expiry_delta(Duration::from_millis(250))
            .to_frame(4);

        assert_eq!(frame.command(), Command::List);
        assert_eq!(keys(&frame), vec!["uri", "expiryDelta"]);
        assert_eq!(value(&frame, "expiryDelta"), "250ms");
    }

    #[test]
    fn test_make_entity_frame() {
        let frame = MakeEntityRequest::new()
            .with_contact("Oski <oski@example.com>")
            .with_comment("bear")
            .with_revoker("r1")
            .with_revoker("r2")
            .to_frame(5);

        assert_eq!(frame.command(), Command::MakeEntity);
        assert_eq!(
            keys(&frame),
            vec!["contact", "comment", "revoker", "revoker", "omitcreationdate"]
        );
        let revokers: Vec<_> = frame.values("revoker").map(|v| v.to_vec()).collect();
        assert_eq!(revokers, vec![b"r1".to_vec(), b"r2".to_vec()]);
        assert_eq!(value(&frame, "omitcreationdate"), "false");
    }

    #[test]
    fn test_make_dot_frame() {
        let frame = MakeDotRequest::new("target")
            .with_ttl(3)
            .with_access_permissions("PC*")
            .with_uri("a/b/*")
            .to_frame(6);

        assert_eq!(frame.command(), Command::MakeDot);
        assert_eq!(
            keys(&frame),
            vec![
                "to",
                "ttl",
                "ispermission",
                "omitcreationdate",
                "accesspermissions",
                "uri"
            ]
        );
        assert_eq!(value(&frame, "ttl"), "3");
        assert_eq!(value(&frame, "accesspermissions"), "PC*");
    }

    #[test]
    fn test_make_chain_frame() {
        let frame = MakeChainRequest::new()
            .with_dot("d1")
            .with_dot("d2")
            .with_unelaborate(true)
            .to_frame(7);

        assert_eq!(frame.command(), Command::MakeChain);
        assert_eq!(keys(&frame), vec!["ispermission", "unelaborate", "dot", "dot"]);
        assert_eq!(value(&frame, "unelaborate"), "true");
    }

    #[test]
    fn test_set_entity_frame() {
        let frame = set_entity_frame(Bytes::from_static(b"key"), 8);
        assert_eq!(frame.command(), Command::SetEntity);
        assert!(frame.kv_pairs().is_empty());
        assert_eq!(
            frame.payload_objects()[0].po_type(),
            PayloadType::Octet([1, 0, 1, 2])
        );
        assert_eq!(frame.payload_objects()[0].content().as_ref(), b"key");
    }
}

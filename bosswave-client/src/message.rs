//! Values delivered to request callbacks.

use crate::error::ClientError;
use bosswave_protocol::{Frame, PayloadObject, RoutingObject};
use serde::Serialize;

/// Status value the router uses for a successful operation.
pub const STATUS_OKAY: &str = "okay";

/// Outcome of a request, carried by a `resp` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: String,
    pub reason: Option<String>,
}

impl Response {
    pub fn okay() -> Self {
        Self {
            status: STATUS_OKAY.to_string(),
            reason: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OKAY
    }

    /// Reads `status`, and `reason` for non-okay statuses, from a `resp` frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, ClientError> {
        let status = frame
            .first_value_str("status")
            .ok_or(ClientError::MissingField("status"))?
            .into_owned();

        let reason = if status == STATUS_OKAY {
            None
        } else {
            Some(
                frame
                    .first_value_str("reason")
                    .ok_or(ClientError::MissingField("reason"))?
                    .into_owned(),
            )
        };

        Ok(Self { status, reason })
    }

    /// Converts a non-okay response into [`ClientError::Server`].
    pub fn into_result(self) -> Result<(), ClientError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ClientError::Server {
                status: self.status,
                reason: self.reason.unwrap_or_default(),
            })
        }
    }
}

/// A message delivered by a subscription, query or make-* operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub seq_no: u32,
    pub uri: String,
    pub from: String,
    pub routing_objects: Vec<RoutingObject>,
    pub payload_objects: Vec<PayloadObject>,
    /// Set on the final result of the operation.
    pub finished: bool,
}

impl Message {
    /// Builds a message from a `rslt` frame. When the frame carries
    /// `unpack=false` the routing and payload objects are left empty.
    pub fn from_frame(frame: &Frame, finished: bool) -> Self {
        let text = |key| {
            frame
                .first_value_str(key)
                .map(|v| v.into_owned())
                .unwrap_or_default()
        };
        let unpack = frame
            .first_value_str("unpack")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let (routing_objects, payload_objects) = if unpack {
            (
                frame.routing_objects().to_vec(),
                frame.payload_objects().to_vec(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            seq_no: frame.seq_no(),
            uri: text("uri"),
            from: text("from"),
            routing_objects,
            payload_objects,
            finished,
        }
    }
}

/// An event of a list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// One child name under the listed URI.
    Child(String),
    /// No more children will follow.
    Finished,
}

/// Parses a protocol boolean. Anything other than `true` (any case) is false.
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

pub(crate) fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosswave_protocol::{Command, PayloadType};

    #[test]
    fn test_response_okay() {
        let frame = Frame::builder(Command::Response, 1)
            .kv("status", "okay")
            .build();
        let response = Response::from_frame(&frame).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.reason, None);
        assert!(response.into_result().is_ok());
    }

    #[test]
    fn test_response_error_requires_reason() {
        let frame = Frame::builder(Command::Response, 1)
            .kv("status", "error")
            .kv("reason", "denied")
            .build();
        let response = Response::from_frame(&frame).unwrap();
        assert_eq!(response.status, "error");
        assert_eq!(response.reason.as_deref(), Some("denied"));
        assert!(matches!(
            response.into_result(),
            Err(ClientError::Server { reason, .. }) if reason == "denied"
        ));

        let frame = Frame::builder(Command::Response, 1)
            .kv("status", "error")
            .build();
        assert!(matches!(
            Response::from_frame(&frame),
            Err(ClientError::MissingField("reason"))
        ));
    }

    #[test]
    fn test_response_missing_status() {
        let frame = Frame::builder(Command::Response, 1).build();
        assert!(matches!(
            Response::from_frame(&frame),
            Err(ClientError::MissingField("status"))
        ));
    }

    #[test]
    fn test_message_unpacked() {
        let po = PayloadObject::new(PayloadType::Octet([64, 0, 0, 0]), "hello");
        let frame = Frame::builder(Command::Result, 9)
            .kv("uri", "a/b")
            .kv("from", "entity")
            .routing_object(RoutingObject::new(2, "chain"))
            .payload_object(po.clone())
            .build();

        let msg = Message::from_frame(&frame, false);
        assert_eq!(msg.seq_no, 9);
        assert_eq!(msg.uri, "a/b");
        assert_eq!(msg.from, "entity");
        assert_eq!(msg.payload_objects, vec![po]);
        assert_eq!(msg.routing_objects.len(), 1);
        assert!(!msg.finished);
    }

    #[test]
    fn test_message_left_packed() {
        let frame = Frame::builder(Command::Result, 9)
            .kv("uri", "a/b")
            .kv("from", "entity")
            .kv("unpack", "false")
            .payload_object(PayloadObject::new(PayloadType::Number(1), "x"))
            .build();

        let msg = Message::from_frame(&frame, true);
        assert!(msg.payload_objects.is_empty());
        assert!(msg.routing_objects.is_empty());
        assert!(msg.finished);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("yes"));
        assert_eq!(bool_str(true), "true");
        assert_eq!(bool_str(false), "false");
    }
}

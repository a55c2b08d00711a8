//! Wire messages exchanged after the handshake.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ProtocolError;
use crate::role::Role;

/// An inbound message from an authenticated client.
///
/// Only the peer-reference key for the sender's role is meaningful; any
/// other keys are carried but ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    fields: Map<String, Value>,
}

impl ScanEvent {
    /// Parse a text frame. The body must be a JSON object.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ProtocolError::NotAnObject(json_kind(&other))),
        }
    }

    /// Parse a binary frame as UTF-8 JSON text.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| ProtocolError::NonUtf8Binary { len: data.len() })?;
        Self::parse(text)
    }

    /// The id of the peer this event targets, given who sent it.
    ///
    /// Strings are taken as-is and integers are rendered in decimal. A
    /// missing key, or a value of any other type, yields `None`.
    pub fn peer_reference(&self, sender: Role) -> Option<String> {
        match self.fields.get(sender.peer_field())? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outbound notification delivered to the scanned peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Always `true`.
    pub scanned: bool,
}

impl Notification {
    /// The one notification the relay ever sends.
    pub const SCANNED: Self = Self { scanned: true };

    /// Serialized form, `{"scanned":true}`.
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| String::from(r#"{"scanned":true}"#))
    }
}

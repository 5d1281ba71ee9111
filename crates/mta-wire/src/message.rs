//! Control-message framing: `type:id:name` optionally followed by `?payload`.

use serde_json::Value;
use std::fmt;

pub const TYPE_ACTION: &str = "action";
pub const TYPE_ACK: &str = "ack";

pub const ACTION_VERSION_NEGOTIATION: &str = "versionNegotiation";
pub const ACTION_SEND_REQUEST: &str = "sendRequest";
pub const ACTION_STATUS: &str = "status";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("message does not match type:id:name(?payload) grammar")]
    Malformed,
    #[error("payload is not valid JSON")]
    BadPayload,
}

/// A parsed WebSocket control frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WsMessage {
    pub kind: String,
    pub id: u64,
    pub name: String,
    pub payload: Option<Value>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

impl WsMessage {
    pub fn new(kind: impl Into<String>, id: u64, name: impl Into<String>) -> Self {
        Self { kind: kind.into(), id, name: name.into(), payload: None }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Parse a wire-format string: `type:id:name` or `type:id:name?json`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (head, json_text) = match text.find('?') {
            Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
            None => (text, None),
        };

        let mut parts = head.splitn(3, ':');
        let kind = parts.next().ok_or(ParseError::Malformed)?;
        let id_str = parts.next().ok_or(ParseError::Malformed)?;
        let name = parts.next().ok_or(ParseError::Malformed)?;

        if kind.is_empty()
            || name.is_empty()
            || !kind.chars().all(is_word_char)
            || !name.chars().all(is_word_char)
        {
            return Err(ParseError::Malformed);
        }
        let id: u64 = id_str.parse().map_err(|_| ParseError::Malformed)?;

        let payload = match json_text {
            Some(j) => Some(serde_json::from_str(j).map_err(|_| ParseError::BadPayload)?),
            None => None,
        };

        Ok(Self { kind: kind.to_string(), id, name: name.to_string(), payload })
    }

    /// Serialize to wire format, optionally substituting a different id.
    pub fn serialize_with_id(&self, id: Option<u64>) -> String {
        let id = id.unwrap_or(self.id);
        let mut out = format!("{}:{}:{}", self.kind, id, self.name);
        if let Some(payload) = &self.payload {
            out.push('?');
            out.push_str(&serde_json::to_string(payload).expect("Value always serializes"));
        }
        out
    }

    /// Build the `ack` counterpart to this message: same id and name.
    pub fn make_ack(&self, response_payload: Option<Value>) -> Self {
        Self { kind: TYPE_ACK.to_string(), id: self.id, name: self.name.clone(), payload: response_payload }
    }

    pub fn is_action(&self, name: &str) -> bool {
        self.kind == TYPE_ACTION && self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_ack(&self, name: &str) -> bool {
        self.kind == TYPE_ACK && self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for WsMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize_with_id(None))
    }
}

pub fn make_version_negotiation(id: u64, version: u32) -> WsMessage {
    WsMessage::new(TYPE_ACTION, id, ACTION_VERSION_NEGOTIATION)
        .with_payload(serde_json::json!({ "version": version, "versions": [version] }))
}

pub fn make_send_request(id: u64, request: &mta_common::models::SendRequest) -> WsMessage {
    WsMessage::new(TYPE_ACTION, id, ACTION_SEND_REQUEST)
        .with_payload(serde_json::to_value(request).expect("SendRequest always serializes"))
}

pub fn make_status(id: u64, status: &mta_common::models::TransferStatus) -> WsMessage {
    WsMessage::new(TYPE_ACTION, id, ACTION_STATUS)
        .with_payload(serde_json::to_value(status).expect("TransferStatus always serializes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_action_with_payload() {
        let msg = WsMessage::new(TYPE_ACTION, 0, ACTION_VERSION_NEGOTIATION)
            .with_payload(serde_json::json!({"version": 1, "versions": [1]}));
        let wire = msg.serialize_with_id(None);
        assert_eq!(wire, "action:0:versionNegotiation?{\"version\":1,\"versions\":[1]}");
        let back = WsMessage::parse(&wire).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn round_trips_ack_without_payload() {
        let wire = "ack:42:sendRequest";
        let msg = WsMessage::parse(wire).unwrap();
        assert_eq!(msg.kind, "ack");
        assert_eq!(msg.id, 42);
        assert_eq!(msg.name, "sendRequest");
        assert!(msg.payload.is_none());
        assert_eq!(msg.serialize_with_id(None), wire);
    }

    #[test]
    fn serialize_with_id_overrides_id() {
        let msg = WsMessage::new(TYPE_ACTION, 7, "status");
        assert_eq!(msg.serialize_with_id(Some(100)), "action:100:status");
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert_eq!(WsMessage::parse("action:x:status"), Err(ParseError::Malformed));
    }

    #[test]
    fn rejects_bad_json_payload() {
        assert_eq!(WsMessage::parse("action:1:status?{not json"), Err(ParseError::BadPayload));
    }

    #[test]
    fn make_ack_preserves_id_and_name() {
        let action = WsMessage::new(TYPE_ACTION, 3, ACTION_SEND_REQUEST);
        let ack = action.make_ack(None);
        assert_eq!(ack.kind, TYPE_ACK);
        assert_eq!(ack.id, 3);
        assert_eq!(ack.name, ACTION_SEND_REQUEST);
    }
}

//! Wire envelope and client messages.
//!
//! Every frame in either direction is a JSON text frame of the form
//! `{"type": "...", "data": ..., "timestamp": "..."}`.

use crate::topic::{Topic, TopicError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names used on the wire.
pub mod events {
    // Hub -> client, one-shot after authentication
    pub const SECURITY_OVERVIEW: &str = "security:overview";
    pub const ALERTS_RECENT: &str = "alerts:recent";

    // Hub -> client, periodic
    pub const SECURITY_METRICS_UPDATE: &str = "security:metrics:update";
    pub const THREATS_UPDATE: &str = "threats:update";
    pub const FRAUD_UPDATE: &str = "fraud:update";
    pub const BLOCKCHAIN_UPDATE: &str = "blockchain:update";
    pub const BIOMETRIC_UPDATE: &str = "biometric:update";

    // Hub -> client, broadcast interrupts
    pub const THREAT_ALERT: &str = "threat:alert";
    pub const FRAUD_ALERT: &str = "fraud:alert";
    pub const SYSTEM_ALERT: &str = "system:alert";

    // Control
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
    pub const JOIN_ROOM: &str = "join_room";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const SUBSCRIBE_PREFIX: &str = "subscribe:";
    pub const UNSUBSCRIBE_PREFIX: &str = "unsubscribe:";
}

/// A single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wrap an error frame.
    pub fn error(error: &ErrorFrame) -> Self {
        Self::new(
            events::ERROR,
            serde_json::json!({ "code": error.code, "message": error.message }),
        )
    }
}

/// Error codes carried in `error` frames.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_MESSAGE: i32 = -32600;
    pub const UNKNOWN_TYPE: i32 = -32601;
    pub const INVALID_TOPIC: i32 = -32602;
    pub const FORBIDDEN_TOPIC: i32 = -32011;
    pub const MESSAGE_TOO_LARGE: i32 = -32005;
    pub const RATE_LIMITED: i32 = -32029;
}

/// Error sent to a client without closing its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub code: i32,
    pub message: String,
}

impl ErrorFrame {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&ParseMessageError> for ErrorFrame {
    fn from(e: &ParseMessageError) -> Self {
        let code = match e {
            ParseMessageError::UnknownType(_) => codes::UNKNOWN_TYPE,
            ParseMessageError::MissingRoom => codes::INVALID_MESSAGE,
            ParseMessageError::InvalidTopic(_) => codes::INVALID_TOPIC,
        };
        ErrorFrame::new(code, e.to_string())
    }
}

/// Messages a client may send to the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    JoinRoom(Topic),
    LeaveRoom(Topic),
    Subscribe(Topic),
    Unsubscribe(Topic),
    Ping(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMessageError {
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("missing room name")]
    MissingRoom,
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),
}

impl ClientMessage {
    /// Interpret an inbound envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ParseMessageError> {
        let kind = envelope.kind.as_str();

        if let Some(topic) = kind.strip_prefix(events::SUBSCRIBE_PREFIX) {
            return Ok(ClientMessage::Subscribe(topic.parse()?));
        }
        if let Some(topic) = kind.strip_prefix(events::UNSUBSCRIBE_PREFIX) {
            return Ok(ClientMessage::Unsubscribe(topic.parse()?));
        }

        match kind {
            events::JOIN_ROOM => Ok(ClientMessage::JoinRoom(room_of(&envelope.data)?)),
            events::LEAVE_ROOM => Ok(ClientMessage::LeaveRoom(room_of(&envelope.data)?)),
            events::PING => Ok(ClientMessage::Ping(envelope.data.clone())),
            other => Err(ParseMessageError::UnknownType(other.to_string())),
        }
    }

    /// Build the envelope a client sends for this message.
    pub fn to_envelope(&self) -> Envelope {
        match self {
            ClientMessage::JoinRoom(room) => Envelope::new(
                events::JOIN_ROOM,
                serde_json::json!({ "room": room.to_string() }),
            ),
            ClientMessage::LeaveRoom(room) => Envelope::new(
                events::LEAVE_ROOM,
                serde_json::json!({ "room": room.to_string() }),
            ),
            ClientMessage::Subscribe(topic) => Envelope::new(
                format!("{}{}", events::SUBSCRIBE_PREFIX, topic),
                Value::Null,
            ),
            ClientMessage::Unsubscribe(topic) => Envelope::new(
                format!("{}{}", events::UNSUBSCRIBE_PREFIX, topic),
                Value::Null,
            ),
            ClientMessage::Ping(data) => Envelope::new(events::PING, data.clone()),
        }
    }
}

fn room_of(data: &Value) -> Result<Topic, ParseMessageError> {
    let room = data
        .get("room")
        .and_then(Value::as_str)
        .ok_or(ParseMessageError::MissingRoom)?;
    Ok(room.parse()?)
}

// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between Puzzlee browser clients and the realtime server.
//! This module defines the WebSocket protocol messages and the client-side
//! subscriber that applies them to local state.

pub mod feed;
pub mod subscription;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use feed::{Applied, EventFeed};
pub use subscription::{SignalSink, Subscription};

/// Room key: an event UUID or its human-readable join code. Any string is accepted.
pub type RoomId = String;

/// Per-room sequence number stamped on every broadcast
pub type Seq = u64;

/// Signals sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientSignal {
    /// Start receiving broadcasts for `room`
    JoinRoom { room: RoomId },
    /// Stop receiving broadcasts for `room`
    LeaveRoom { room: RoomId },
}

impl ClientSignal {
    /// Room this signal refers to
    pub fn room(&self) -> &str {
        match self {
            ClientSignal::JoinRoom { room } | ClientSignal::LeaveRoom { room } => room,
        }
    }
}

/// Kind of record carried by a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Question,
    Answer,
    Comment,
}

/// The fixed set of server-to-client message types
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    #[serde(rename = "question:created")]
    QuestionCreated,
    /// Covers vote tally and moderation changes as well as edits
    #[serde(rename = "question:updated")]
    QuestionUpdated,
    #[serde(rename = "question:deleted")]
    QuestionDeleted,
    #[serde(rename = "answer:created")]
    AnswerCreated,
    #[serde(rename = "comment:created")]
    CommentCreated,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::QuestionCreated,
        MessageType::QuestionUpdated,
        MessageType::QuestionDeleted,
        MessageType::AnswerCreated,
        MessageType::CommentCreated,
    ];

    /// Wire name, e.g. `question:created`
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::QuestionCreated => "question:created",
            MessageType::QuestionUpdated => "question:updated",
            MessageType::QuestionDeleted => "question:deleted",
            MessageType::AnswerCreated => "answer:created",
            MessageType::CommentCreated => "comment:created",
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            MessageType::QuestionCreated
            | MessageType::QuestionUpdated
            | MessageType::QuestionDeleted => EntityKind::Question,
            MessageType::AnswerCreated => EntityKind::Answer,
            MessageType::CommentCreated => EntityKind::Comment,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown message type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageType(pub String);

impl fmt::Display for UnknownMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message type `{}`", self.0)
    }
}

impl std::error::Error for UnknownMessageType {}

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownMessageType(s.to_string()))
    }
}

/// Message fanned out to every member of a room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BroadcastMessage {
    /// Message type
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Room the message was broadcast to
    #[serde(default)]
    pub room: RoomId,
    /// Per-room sequence number, `0` when the sender did not stamp one
    #[serde(default)]
    pub seq: Seq,
    /// The record exactly as the REST write returned it
    pub entity: Value,
}

impl BroadcastMessage {
    /// Identifier of the carried entity, if it has one
    pub fn entity_id(&self) -> Option<String> {
        entity_id(&self.entity)
    }
}

/// Extract the `id` field of a serialized entity. Numeric ids are stringified.
pub fn entity_id(entity: &Value) -> Option<String> {
    match entity.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_signal_wire_format() {
        let join = ClientSignal::JoinRoom {
            room: "EVT1".to_string(),
        };
        let parsed: Value = serde_json::to_value(&join).unwrap();
        assert_eq!(parsed, json!({"type": "join-room", "room": "EVT1"}));

        let leave: ClientSignal =
            serde_json::from_str(r#"{"type":"leave-room","room":"EVT1"}"#).unwrap();
        assert_eq!(leave.room(), "EVT1");
        assert!(matches!(leave, ClientSignal::LeaveRoom { .. }));
    }

    #[test]
    fn test_unknown_signal_is_rejected() {
        assert!(serde_json::from_str::<ClientSignal>(r#"{"type":"shout","room":"x"}"#).is_err());
        assert!(serde_json::from_str::<ClientSignal>(r#"{"type":"join-room"}"#).is_err());
    }

    #[test]
    fn test_message_type_names() {
        for kind in MessageType::ALL {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, Value::String(kind.as_str().to_string()));
            assert_eq!(kind.as_str().parse::<MessageType>().unwrap(), kind);
        }
        assert_eq!(
            "vote:cast".parse::<MessageType>(),
            Err(UnknownMessageType("vote:cast".to_string()))
        );
        assert_eq!(MessageType::AnswerCreated.entity_kind(), EntityKind::Answer);
    }

    #[test]
    fn test_broadcast_message_serialization() {
        let msg = BroadcastMessage {
            kind: MessageType::QuestionCreated,
            room: "EVT1".to_string(),
            seq: 3,
            entity: json!({"id": "q1", "content": "Hello?"}),
        };

        let parsed = serde_json::to_value(&msg).unwrap();
        assert_eq!(parsed["type"], "question:created");
        assert_eq!(parsed["room"], "EVT1");
        assert_eq!(parsed["seq"], 3);
        assert_eq!(parsed["entity"]["content"], "Hello?");

        // frames without room/seq still parse
        let bare: BroadcastMessage =
            serde_json::from_str(r#"{"type":"question:deleted","entity":{"id":7}}"#).unwrap();
        assert_eq!(bare.seq, 0);
        assert_eq!(bare.entity_id().as_deref(), Some("7"));
    }

    #[test]
    fn test_entity_id_requires_scalar_id() {
        assert_eq!(entity_id(&json!({"content": "no id"})), None);
        assert_eq!(entity_id(&json!({"id": null})), None);
        assert_eq!(entity_id(&json!("q1")), None);
    }
}

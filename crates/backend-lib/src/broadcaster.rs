// ============================
// puzzlee-realtime/src/broadcaster.rs
// ============================
//! Post-mutation fan-out.
//!
//! REST handlers call into the [`Broadcaster`] once a write has committed.
//! Delivery is fire-and-forget: nothing is acknowledged or retried, and a
//! failed delivery to one connection never reaches the caller.

use std::sync::Arc;

use metrics::counter;
use puzzlee_common::MessageType;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::AppError;
use crate::metrics::{BROADCAST_DELIVERED, BROADCAST_DROPPED, BROADCAST_SENT};
use crate::registry::{Delivery, RoomRegistry};

/// Cloneable handle for emitting typed messages into event rooms
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Deliver `{type, entity}` to every member of `room`
    pub fn broadcast(&self, room: &str, kind: MessageType, entity: Value) -> Delivery {
        let delivery = self.registry.deliver(room, kind, entity);

        let Some(seq) = delivery.seq else {
            debug!(room, %kind, "broadcast to empty room");
            return delivery;
        };

        counter!(BROADCAST_SENT, "type" => kind.as_str()).increment(1);
        counter!(BROADCAST_DELIVERED).increment(delivery.delivered as u64);
        if delivery.dropped > 0 {
            counter!(BROADCAST_DROPPED).increment(delivery.dropped as u64);
        }
        info!(
            room,
            %kind,
            seq,
            delivered = delivery.delivered,
            dropped = delivery.dropped,
            "broadcast"
        );
        delivery
    }

    /// Serialize `entity` and broadcast it
    pub fn emit<T: Serialize + ?Sized>(
        &self,
        room: &str,
        kind: MessageType,
        entity: &T,
    ) -> Result<Delivery, AppError> {
        let entity = serde_json::to_value(entity)?;
        Ok(self.broadcast(room, kind, entity))
    }

    /// Broadcast the outcome of a write only if it succeeded.
    /// Failed writes are left to the REST response and emit nothing.
    pub fn relay<T: Serialize, E>(
        &self,
        room: &str,
        kind: MessageType,
        result: &Result<T, E>,
    ) -> Result<Option<Delivery>, AppError> {
        match result {
            Ok(entity) => self.emit(room, kind, entity).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn question_created<T: Serialize + ?Sized>(
        &self,
        room: &str,
        question: &T,
    ) -> Result<Delivery, AppError> {
        self.emit(room, MessageType::QuestionCreated, question)
    }

    /// Edits, vote tally changes and moderation changes all go out as `question:updated`
    pub fn question_updated<T: Serialize + ?Sized>(
        &self,
        room: &str,
        question: &T,
    ) -> Result<Delivery, AppError> {
        self.emit(room, MessageType::QuestionUpdated, question)
    }

    pub fn question_deleted<T: Serialize + ?Sized>(
        &self,
        room: &str,
        question: &T,
    ) -> Result<Delivery, AppError> {
        self.emit(room, MessageType::QuestionDeleted, question)
    }

    pub fn answer_created<T: Serialize + ?Sized>(
        &self,
        room: &str,
        answer: &T,
    ) -> Result<Delivery, AppError> {
        self.emit(room, MessageType::AnswerCreated, answer)
    }

    pub fn comment_created<T: Serialize + ?Sized>(
        &self,
        room: &str,
        comment: &T,
    ) -> Result<Delivery, AppError> {
        self.emit(room, MessageType::CommentCreated, comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionHandle;
    use serde_json::json;

    #[derive(Serialize)]
    struct Question {
        id: &'static str,
        content: &'static str,
        votes: u32,
    }

    fn setup() -> (Broadcaster, Arc<RoomRegistry>) {
        let registry = Arc::new(RoomRegistry::new());
        (Broadcaster::new(registry.clone()), registry)
    }

    #[test]
    fn test_typed_helpers_tag_messages() {
        let (broadcaster, registry) = setup();
        let (conn, mut rx) = ConnectionHandle::channel(16);
        registry.join(&conn, "EVT1");

        let question = Question {
            id: "q1",
            content: "Hello?",
            votes: 0,
        };
        broadcaster.question_created("EVT1", &question).unwrap();
        broadcaster.question_updated("EVT1", &json!({"id": "q1", "votes": 1})).unwrap();
        broadcaster.answer_created("EVT1", &json!({"id": "a1"})).unwrap();
        broadcaster.comment_created("EVT1", &json!({"id": "c1"})).unwrap();
        broadcaster.question_deleted("EVT1", &json!({"id": "q1"})).unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                MessageType::QuestionCreated,
                MessageType::QuestionUpdated,
                MessageType::AnswerCreated,
                MessageType::CommentCreated,
                MessageType::QuestionDeleted,
            ]
        );
    }

    #[test]
    fn test_entity_is_serialized_verbatim() {
        let (broadcaster, registry) = setup();
        let (conn, mut rx) = ConnectionHandle::channel(16);
        registry.join(&conn, "EVT1");

        let question = Question {
            id: "q1",
            content: "Hello?",
            votes: 3,
        };
        let delivery = broadcaster.question_created("EVT1", &question).unwrap();
        assert_eq!(delivery.seq, Some(1));

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.entity, json!({"id": "q1", "content": "Hello?", "votes": 3}));
    }

    #[test]
    fn test_empty_room_is_a_no_op() {
        let (broadcaster, _registry) = setup();
        let delivery = broadcaster
            .question_created("nobody-here", &json!({"id": "q1"}))
            .unwrap();
        assert_eq!(delivery, Delivery::default());
    }

    #[test]
    fn test_relay_skips_failed_writes() {
        let (broadcaster, registry) = setup();
        let (conn, mut rx) = ConnectionHandle::channel(16);
        registry.join(&conn, "EVT1");

        let failed: Result<Value, String> = Err("permission denied".to_string());
        let outcome = broadcaster
            .relay("EVT1", MessageType::QuestionUpdated, &failed)
            .unwrap();
        assert!(outcome.is_none());
        assert!(rx.try_recv().is_err());

        let ok: Result<Value, String> = Ok(json!({"id": "q1", "status": "approved"}));
        let outcome = broadcaster
            .relay("EVT1", MessageType::QuestionUpdated, &ok)
            .unwrap();
        assert_eq!(outcome.map(|d| d.delivered), Some(1));
        assert_eq!(rx.try_recv().unwrap().entity["status"], "approved");
    }
}

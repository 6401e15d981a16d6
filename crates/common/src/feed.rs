//! Local view of one event's questions, answers and comments, kept current by
//! applying broadcasts as they arrive.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{BroadcastMessage, EntityKind, MessageType, RoomId, Seq};

/// What applying a broadcast did to the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New entity placed at the front of its list
    Prepended,
    /// Fields merged into an existing entity
    Merged,
    /// Entity removed
    Removed,
    /// Target entity not present locally; nothing changed
    Dropped,
    /// Message belongs to another room
    Ignored,
}

/// Client-side state for a single event room.
///
/// Updates and deletes for entities that were never seen locally are dropped.
/// There is no fetch fallback, so a missed `question:created` leaves that
/// question invisible until the page is reloaded.
#[derive(Debug, Clone, Default)]
pub struct EventFeed {
    room: RoomId,
    questions: Vec<Value>,
    answers: Vec<Value>,
    comments: Vec<Value>,
    last_seq: Option<Seq>,
    gaps: u64,
}

impl EventFeed {
    pub fn new(room: impl Into<RoomId>) -> Self {
        Self {
            room: room.into(),
            ..Self::default()
        }
    }

    /// Seed the feed from the REST API's initial listing
    pub fn with_questions(mut self, questions: Vec<Value>) -> Self {
        self.questions = questions;
        self
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn questions(&self) -> &[Value] {
        &self.questions
    }

    pub fn answers(&self) -> &[Value] {
        &self.answers
    }

    pub fn comments(&self) -> &[Value] {
        &self.comments
    }

    /// Last sequence number observed, if any message was stamped
    pub fn last_seq(&self) -> Option<Seq> {
        self.last_seq
    }

    /// Number of sequence discontinuities observed since the feed was created
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    /// Apply one inbound broadcast
    pub fn apply(&mut self, msg: &BroadcastMessage) -> Applied {
        if !msg.room.is_empty() && msg.room != self.room {
            return Applied::Ignored;
        }

        self.track_seq(msg.seq);

        let list = match msg.kind.entity_kind() {
            EntityKind::Question => &mut self.questions,
            EntityKind::Answer => &mut self.answers,
            EntityKind::Comment => &mut self.comments,
        };

        match msg.kind {
            MessageType::QuestionCreated
            | MessageType::AnswerCreated
            | MessageType::CommentCreated => {
                list.insert(0, msg.entity.clone());
                Applied::Prepended
            },
            MessageType::QuestionUpdated => {
                let Some(existing) = find_mut(list, msg) else {
                    debug!(room = %self.room, "update for unknown entity dropped");
                    return Applied::Dropped;
                };
                merge_fields(existing, &msg.entity);
                Applied::Merged
            },
            MessageType::QuestionDeleted => {
                let Some(id) = msg.entity_id() else {
                    return Applied::Dropped;
                };
                let before = list.len();
                list.retain(|entity| crate::entity_id(entity).as_deref() != Some(id.as_str()));
                if list.len() == before {
                    Applied::Dropped
                } else {
                    Applied::Removed
                }
            },
        }
    }

    fn track_seq(&mut self, seq: Seq) {
        if seq == 0 {
            return;
        }
        if let Some(last) = self.last_seq {
            if seq != last + 1 {
                self.gaps += 1;
                warn!(room = %self.room, last, seq, "broadcast sequence gap");
            }
        }
        self.last_seq = Some(seq);
    }
}

fn find_mut<'a>(list: &'a mut [Value], msg: &BroadcastMessage) -> Option<&'a mut Value> {
    let id = msg.entity_id()?;
    list.iter_mut()
        .find(|entity| crate::entity_id(entity).as_deref() == Some(id.as_str()))
}

fn merge_fields(existing: &mut Value, update: &Value) {
    match (existing.as_object_mut(), update.as_object()) {
        (Some(target), Some(fields)) => {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        },
        _ => *existing = update.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(kind: MessageType, seq: Seq, entity: Value) -> BroadcastMessage {
        BroadcastMessage {
            kind,
            room: "EVT1".to_string(),
            seq,
            entity,
        }
    }

    #[test]
    fn test_created_prepends() {
        let mut feed = EventFeed::new("EVT1");
        feed.apply(&msg(MessageType::QuestionCreated, 1, json!({"id": "q1"})));
        feed.apply(&msg(MessageType::QuestionCreated, 2, json!({"id": "q2"})));

        let ids: Vec<_> = feed.questions().iter().map(|q| q["id"].clone()).collect();
        assert_eq!(ids, vec![json!("q2"), json!("q1")]);
    }

    #[test]
    fn test_updated_merges_fields_in_place() {
        let mut feed = EventFeed::new("EVT1").with_questions(vec![
            json!({"id": "q1", "content": "Hello?", "votes": 0, "status": "pending"}),
        ]);

        let applied = feed.apply(&msg(
            MessageType::QuestionUpdated,
            1,
            json!({"id": "q1", "votes": 4}),
        ));

        assert_eq!(applied, Applied::Merged);
        assert_eq!(
            feed.questions()[0],
            json!({"id": "q1", "content": "Hello?", "votes": 4, "status": "pending"})
        );
    }

    #[test]
    fn test_update_without_create_is_dropped() {
        let mut feed = EventFeed::new("EVT1").with_questions(vec![json!({"id": "q1"})]);

        let applied = feed.apply(&msg(
            MessageType::QuestionUpdated,
            1,
            json!({"id": "ghost", "votes": 9}),
        ));

        assert_eq!(applied, Applied::Dropped);
        assert_eq!(feed.questions(), &[json!({"id": "q1"})]);
    }

    #[test]
    fn test_deleted_removes_by_id() {
        let mut feed = EventFeed::new("EVT1")
            .with_questions(vec![json!({"id": 1}), json!({"id": 2})]);

        assert_eq!(
            feed.apply(&msg(MessageType::QuestionDeleted, 1, json!({"id": 1}))),
            Applied::Removed
        );
        assert_eq!(
            feed.apply(&msg(MessageType::QuestionDeleted, 2, json!({"id": 1}))),
            Applied::Dropped
        );
        assert_eq!(feed.questions(), &[json!({"id": 2})]);
    }

    #[test]
    fn test_answers_and_comments_have_their_own_lists() {
        let mut feed = EventFeed::new("EVT1");
        feed.apply(&msg(MessageType::AnswerCreated, 1, json!({"id": "a1"})));
        feed.apply(&msg(MessageType::CommentCreated, 2, json!({"id": "c1"})));

        assert!(feed.questions().is_empty());
        assert_eq!(feed.answers().len(), 1);
        assert_eq!(feed.comments().len(), 1);
    }

    #[test]
    fn test_other_room_is_ignored() {
        let mut feed = EventFeed::new("EVT2");
        let applied = feed.apply(&msg(MessageType::QuestionCreated, 1, json!({"id": "q1"})));

        assert_eq!(applied, Applied::Ignored);
        assert!(feed.questions().is_empty());
        assert_eq!(feed.last_seq(), None);
    }

    #[test]
    fn test_sequence_gap_is_counted() {
        let mut feed = EventFeed::new("EVT1");
        feed.apply(&msg(MessageType::QuestionCreated, 1, json!({"id": "q1"})));
        feed.apply(&msg(MessageType::QuestionCreated, 2, json!({"id": "q2"})));
        assert_eq!(feed.gaps(), 0);

        feed.apply(&msg(MessageType::QuestionCreated, 5, json!({"id": "q5"})));
        assert_eq!(feed.gaps(), 1);
        assert_eq!(feed.last_seq(), Some(5));

        // unstamped messages don't disturb tracking
        feed.apply(&msg(MessageType::QuestionCreated, 0, json!({"id": "q6"})));
        assert_eq!(feed.last_seq(), Some(5));
        assert_eq!(feed.questions().len(), 4);
    }
}

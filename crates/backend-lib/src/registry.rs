// ============================
// puzzlee-realtime/src/registry.rs
// ============================
//! Room membership: which live connections are viewing which event.
//!
//! Rooms exist implicitly while they have members and are released when the
//! last member leaves. All state is in-process; running more than one server
//! instance needs an external pub/sub layer in front of this registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use metrics::{counter, gauge};
use puzzlee_common::{BroadcastMessage, MessageType, RoomId, Seq};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::metrics::{ROOMS_ACTIVE, ROOM_JOIN, ROOM_LEAVE};

pub type ConnectionId = Uuid;

/// Bounded queue feeding a connection's socket writer
pub type Outbox = mpsc::Sender<Arc<BroadcastMessage>>;

/// A live client connection as the registry sees it
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbox: Outbox,
}

impl ConnectionHandle {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbox,
        }
    }

    /// New handle plus the receiving end of an outbox holding at most
    /// `capacity` undelivered messages
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<BroadcastMessage>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Sequence number stamped on the message; `None` when the room was empty
    pub seq: Option<Seq>,
    /// Members whose outbox accepted the message
    pub delivered: usize,
    /// Members whose connection was already gone or whose outbox was full
    pub dropped: usize,
}

#[derive(Default)]
struct Room {
    members: HashMap<ConnectionId, Outbox>,
    last_seq: Seq,
}

/// Registry of event rooms and their member connections
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    memberships: DashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `room`. Returns `false` if it was already a member.
    pub fn join(&self, conn: &ConnectionHandle, room: &str) -> bool {
        let newly_joined = {
            let mut entry = self.rooms.entry(room.to_string()).or_default();
            entry
                .members
                .insert(conn.id, conn.outbox.clone())
                .is_none()
        };
        self.memberships
            .entry(conn.id)
            .or_default()
            .insert(room.to_string());

        if newly_joined {
            counter!(ROOM_JOIN).increment(1);
            gauge!(ROOMS_ACTIVE).set(self.rooms.len() as f64);
            debug!(conn_id = %conn.id, room, "joined room");
        }
        newly_joined
    }

    /// Remove `conn` from `room`. Leaving a room it never joined is a no-op.
    pub fn leave(&self, conn: ConnectionId, room: &str) -> bool {
        let removed = self.remove_member(room, conn);

        if let Some(mut rooms) = self.memberships.get_mut(&conn) {
            rooms.remove(room);
        }
        self.memberships.remove_if(&conn, |_, rooms| rooms.is_empty());

        if removed {
            counter!(ROOM_LEAVE).increment(1);
            debug!(conn_id = %conn, room, "left room");
        }
        removed
    }

    /// Drop `conn` from every room it joined. Returns how many rooms it left.
    pub fn on_disconnect(&self, conn: ConnectionId) -> usize {
        let Some((_, rooms)) = self.memberships.remove(&conn) else {
            return 0;
        };

        let mut left = 0;
        for room in &rooms {
            if self.remove_member(room, conn) {
                left += 1;
            }
        }
        if left > 0 {
            counter!(ROOM_LEAVE).increment(left as u64);
            debug!(conn_id = %conn, rooms = left, "released memberships on disconnect");
        }
        left
    }

    /// Stamp the next sequence number for `room` and queue the message on
    /// every member's outbox. Members whose connection already closed, or
    /// whose writer has fallen a full outbox behind, miss this message
    /// without affecting the others.
    pub fn deliver(&self, room: &str, kind: MessageType, entity: Value) -> Delivery {
        let Some(mut entry) = self.rooms.get_mut(room) else {
            return Delivery::default();
        };
        if entry.members.is_empty() {
            return Delivery::default();
        }

        entry.last_seq += 1;
        let seq = entry.last_seq;
        let msg = Arc::new(BroadcastMessage {
            kind,
            room: room.to_string(),
            seq,
            entity,
        });

        let mut delivery = Delivery {
            seq: Some(seq),
            ..Delivery::default()
        };
        for (conn_id, outbox) in &entry.members {
            match outbox.try_send(Arc::clone(&msg)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    debug!(%conn_id, room, seq, "outbox full, delivery dropped");
                },
                Err(TrySendError::Closed(_)) => {
                    delivery.dropped += 1;
                    debug!(%conn_id, room, seq, "delivery to closed connection dropped");
                },
            }
        }
        delivery
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |entry| entry.members.len())
    }

    pub fn is_member(&self, conn: ConnectionId, room: &str) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|entry| entry.members.contains_key(&conn))
    }

    /// Rooms `conn` currently belongs to, sorted
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .memberships
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Number of rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of connections joined to at least one room
    pub fn connection_count(&self) -> usize {
        self.memberships.len()
    }

    fn remove_member(&self, room: &str, conn: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut entry) => entry.members.remove(&conn).is_some(),
            None => false,
        };
        self.rooms.remove_if(room, |_, entry| entry.members.is_empty());
        if removed {
            gauge!(ROOMS_ACTIVE).set(self.rooms.len() as f64);
        }
        removed
    }
}

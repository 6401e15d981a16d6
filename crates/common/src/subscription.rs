//! Page-lifetime room subscription: join on mount, leave on unmount.

use tokio::sync::mpsc;
use tracing::debug;

use crate::{Applied, BroadcastMessage, ClientSignal, EventFeed, RoomId};

/// Outbound half of a client connection
pub trait SignalSink {
    /// Queue a signal for the server. Returns `false` when the connection is gone.
    fn send_signal(&self, signal: ClientSignal) -> bool;
}

impl SignalSink for mpsc::UnboundedSender<ClientSignal> {
    fn send_signal(&self, signal: ClientSignal) -> bool {
        self.send(signal).is_ok()
    }
}

/// Membership in one room for as long as the value lives.
///
/// Mounting sends `join-room`; dropping (or [`Subscription::unmount`]) sends
/// `leave-room`. Inbound broadcasts are handed to [`Subscription::handle`]
/// which applies them to the owned [`EventFeed`]. A lost connection is not
/// reported and nothing is re-joined after a reconnect.
///
/// Membership is per connection, not per subscription: the server treats a
/// repeated join as a no-op, so when two subscriptions on one connection
/// mount the same room, dropping either one takes the connection out of the
/// room for both. Keep at most one live subscription per room per connection.
pub struct Subscription<S: SignalSink> {
    sink: S,
    feed: EventFeed,
}

impl<S: SignalSink> Subscription<S> {
    pub fn mount(sink: S, room: impl Into<RoomId>) -> Self {
        Self::mount_with(sink, EventFeed::new(room))
    }

    /// Mount with a feed already seeded from the REST listing
    pub fn mount_with(sink: S, feed: EventFeed) -> Self {
        let joined = sink.send_signal(ClientSignal::JoinRoom {
            room: feed.room().to_string(),
        });
        if !joined {
            debug!(room = %feed.room(), "join signal not sent, connection closed");
        }
        Self { sink, feed }
    }

    pub fn room(&self) -> &str {
        self.feed.room()
    }

    pub fn feed(&self) -> &EventFeed {
        &self.feed
    }

    pub fn handle(&mut self, msg: &BroadcastMessage) -> Applied {
        self.feed.apply(msg)
    }

    /// Leave the room now and hand back the final local state
    pub fn unmount(self) -> EventFeed {
        self.feed.clone()
    }
}

impl<S: SignalSink> Drop for Subscription<S> {
    fn drop(&mut self) {
        let _ = self.sink.send_signal(ClientSignal::LeaveRoom {
            room: self.feed.room().to_string(),
        });
    }
}

// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const ROOM_JOIN: &str = "room.join";
pub const ROOM_LEAVE: &str = "room.leave";
pub const ROOMS_ACTIVE: &str = "room.active";
pub const BROADCAST_SENT: &str = "broadcast.sent";
pub const BROADCAST_DELIVERED: &str = "broadcast.delivered";
pub const BROADCAST_DROPPED: &str = "broadcast.dropped";

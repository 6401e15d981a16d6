// ============================
// puzzlee-realtime/src/lib.rs
// ============================
//! Realtime fan-out for Puzzlee event rooms.
//!
//! Browser clients hold a WebSocket and join the room of the event they are
//! viewing. After the REST layer commits a write it hands the resulting
//! entity to the [`Broadcaster`], which pushes it to every connection in
//! that event's room.

pub mod broadcaster;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod telemetry;
pub mod ws_router;

use std::sync::Arc;

pub use crate::broadcaster::Broadcaster;
pub use crate::config::Settings;
pub use crate::error::AppError;
pub use crate::registry::{ConnectionHandle, Delivery, RoomRegistry};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Room membership
    pub registry: Arc<RoomRegistry>,
    /// Typed fan-out over `registry`
    pub broadcaster: Broadcaster,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create application state with a fresh, empty registry
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        Self {
            registry,
            broadcaster,
            settings: Arc::new(settings),
        }
    }
}

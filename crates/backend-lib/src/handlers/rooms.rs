// ============================
// crates/backend-lib/src/handlers/rooms.rs
// ============================
//! HTTP surface used by the REST layer after a committed write.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use puzzlee_common::{MessageType, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::registry::Delivery;
use crate::AppState;

/// Body of `POST /rooms/{room}/broadcast`
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub entity: Value,
}

/// Reply to a publish request
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastReceipt {
    pub room: RoomId,
    pub seq: Option<u64>,
    pub delivered: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room: RoomId,
    pub members: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub rooms: usize,
    pub connections: usize,
}

/// Fan a committed write out to the room
pub async fn broadcast_to_room(
    State(state): State<Arc<AppState>>,
    Path(room): Path<RoomId>,
    body: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BroadcastReceipt>), AppError> {
    let Json(request) = body.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;

    if !request.entity.is_object() {
        return Err(AppError::InvalidInput(
            "entity must be a JSON object".to_string(),
        ));
    }

    let Delivery { seq, delivered, .. } =
        state
            .broadcaster
            .broadcast(&room, request.kind, request.entity);

    Ok((
        StatusCode::ACCEPTED,
        Json(BroadcastReceipt {
            room,
            seq,
            delivered,
        }),
    ))
}

pub async fn room_info(
    State(state): State<Arc<AppState>>,
    Path(room): Path<RoomId>,
) -> Json<RoomInfo> {
    let members = state.registry.member_count(&room);
    Json(RoomInfo { room, members })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        rooms: state.registry.room_count(),
        connections: state.registry.connection_count(),
    })
}

// ============================
// puzzlee-realtime/src/ws_router.rs
// ============================
//! Router and WebSocket connection handling.
use crate::handlers::rooms;
use crate::metrics::{WS_ACTIVE, WS_CONNECTION};
use crate::registry::ConnectionHandle;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use puzzlee_common::ClientSignal;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Instrument};

/// Create the application router: the client WebSocket plus the publish API.
///
/// The publish routes carry no authentication. Expose only `/ws` publicly
/// and keep `/rooms/*` reachable from the REST layer's network alone;
/// `cors_allowed_origins` should name the frontend origin in production.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_allowed_origins);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms/{room}", get(rooms::room_info))
        .route("/rooms/{room}/broadcast", post(rooms::broadcast_to_room))
        .route("/health", get(rooms::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            },
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

/// Handler for WebSocket connections
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    counter!(WS_CONNECTION).increment(1);

    ws.max_message_size(state.settings.max_frame_bytes)
        .on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (conn, mut outbox_rx) = ConnectionHandle::channel(state.settings.outbox_capacity);
    let conn_id = conn.id();
    let span = tracing::info_span!("ws", %conn_id);

    gauge!(WS_ACTIVE).increment(1.0);
    info!(parent: &span, "connection opened");

    let (mut tx, mut rx) = socket.split();

    // Writer: forward queued broadcasts to the socket
    let send_task = tokio::spawn(
        async move {
            while let Some(msg) = outbox_rx.recv().await {
                let json = match serde_json::to_string(msg.as_ref()) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to serialize broadcast: {e}");
                        continue;
                    },
                };
                if tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
        .instrument(span.clone()),
    );

    // Reader: apply join/leave signals until the client goes away
    async {
        while let Some(frame) = rx.next().await {
            let message = match frame {
                Ok(message) => message,
                Err(e) => {
                    debug!("socket error: {e}");
                    break;
                },
            };

            match message {
                Message::Text(text) => match serde_json::from_str::<ClientSignal>(text.as_str()) {
                    Ok(ClientSignal::JoinRoom { room }) => {
                        state.registry.join(&conn, &room);
                    },
                    Ok(ClientSignal::LeaveRoom { room }) => {
                        state.registry.leave(conn_id, &room);
                    },
                    Err(e) => warn!("ignoring malformed client frame: {e}"),
                },
                Message::Close(_) => break,
                _ => {}, // binary frames are not part of the protocol; ping/pong handled by axum
            }
        }
    }
    .instrument(span.clone())
    .await;

    // Cleanup: release every membership so nothing is queued for a dead socket
    let released = state.registry.on_disconnect(conn_id);
    send_task.abort();

    gauge!(WS_ACTIVE).decrement(1.0);
    info!(parent: &span, rooms_released = released, "connection closed");
}

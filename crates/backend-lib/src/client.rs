// ============================
// puzzlee-realtime/src/client.rs
// ============================
//! WebSocket client for the realtime server.
//!
//! Pairs a socket with the [`Subscription`] logic from `puzzlee-common`, the
//! same way a browser page does: mount joins the room, dropping leaves it.
//! Like the browser client, nothing is re-joined if the socket drops.
use futures_util::{SinkExt, StreamExt};
use puzzlee_common::{BroadcastMessage, ClientSignal, RoomId, Subscription};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::error::AppError;

/// Open connection to `/ws`
pub struct RoomClient {
    signals: mpsc::UnboundedSender<ClientSignal>,
    inbound: mpsc::UnboundedReceiver<BroadcastMessage>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl RoomClient {
    /// Connect to a server's WebSocket endpoint, e.g. `ws://127.0.0.1:4000/ws`
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let (socket, _response) = connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let (signals, mut signal_rx) = mpsc::unbounded_channel::<ClientSignal>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(signal) = signal_rx.recv().await {
                let json = match serde_json::to_string(&signal) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to serialize signal: {e}");
                        continue;
                    },
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(Ok(frame)) = stream.next().await {
                match frame {
                    Message::Text(text) => {
                        match serde_json::from_str::<BroadcastMessage>(text.as_str()) {
                            Ok(msg) => {
                                if inbound_tx.send(msg).is_err() {
                                    break;
                                }
                            },
                            Err(e) => debug!("ignoring unrecognised frame: {e}"),
                        }
                    },
                    Message::Close(_) => break,
                    _ => {},
                }
            }
        });

        Ok(Self {
            signals,
            inbound,
            writer,
            reader,
        })
    }

    /// Sender for raw join/leave signals
    pub fn signals(&self) -> mpsc::UnboundedSender<ClientSignal> {
        self.signals.clone()
    }

    /// Join `room` for the lifetime of the returned subscription
    pub fn subscribe(
        &self,
        room: impl Into<RoomId>,
    ) -> Subscription<mpsc::UnboundedSender<ClientSignal>> {
        Subscription::mount(self.signals(), room)
    }

    /// Next broadcast from any joined room; `None` once the socket is closed
    pub async fn next_message(&mut self) -> Option<BroadcastMessage> {
        self.inbound.recv().await
    }
}

impl Drop for RoomClient {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

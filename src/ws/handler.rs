//! WebSocket upgrade handler and per-connection session

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::relay::core::RelayCore;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.core))
}

/// Handle the upgraded WebSocket connection.
///
/// The reader half only decodes frames and dispatches them into the relay
/// core; the writer half drains the connection's outbound channel. Neither
/// side ever applies vehicle input or broadcasts.
async fn handle_socket(socket: WebSocket, core: Arc<RelayCore>) {
    let id = Uuid::new_v4();
    info!(connection_id = %id, "telemetry client connected");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    core.registry().add(id, tx);

    // Writer task: outbound channel -> socket
    let writer_id = id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = ws_sink.send(msg).await {
                debug!(connection_id = %writer_id, error = %e, "WebSocket send failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Reader loop: socket -> relay core
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Binary(payload)) => core.handle_frame(&payload),
            Ok(Message::Text(text)) => core.handle_frame(text.as_bytes()),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %id, "client initiated close");
                break;
            }
            Err(e) => {
                warn!(connection_id = %id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    core.registry().remove(&id);
    writer_handle.abort();

    info!(connection_id = %id, "telemetry client disconnected");
}

//! Listener presence WebSocket
//!
//! GET /ws upgrades to a WebSocket. The server pushes the listening count
//! as a text frame whenever it changes; the client sends `listening` or
//! `paused` text frames.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::debug;

use crate::presence::{ListenerIntent, PresenceBroadcaster};
use crate::AppState;

/// GET /ws
pub async fn listener_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_listener_socket(socket, state.presence))
}

/// Drive one listener session until either direction closes
async fn handle_listener_socket(socket: WebSocket, presence: Arc<PresenceBroadcaster>) {
    let (mut sender, mut receiver) = socket.split();
    let session = presence.connect().await;
    let session_id = session.id;
    let mut updates = session.updates;

    // Outbound: forward count changes until the socket rejects a send
    let mut send_task = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let count = *updates.borrow_and_update();
            if sender.send(Message::Text(count.to_string())).await.is_err() {
                break;
            }
        }
    });

    // Inbound: apply intents until the client closes or errors
    let inbound_presence = Arc::clone(&presence);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match text.parse::<ListenerIntent>() {
                    Ok(intent) => {
                        inbound_presence.on_message(session_id, intent).await;
                    }
                    Err(e) => debug!(session = %session_id, "Ignoring message: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    presence.disconnect(session_id).await;
}

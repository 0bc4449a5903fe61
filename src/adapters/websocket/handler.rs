//! WebSocket upgrade handler for chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket and open a session with the hub
//! 2. Announce the connection id
//! 3. Forward hub events to the client / dispatch client frames to the session
//! 4. Disconnect from the hub exactly once when either side stops

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::adapters::http::RelayState;
use crate::application::ConnectionSession;
use crate::domain::chat::Identity;
use crate::domain::foundation::{RoomId, Timestamp};

use super::messages::{ClientMessage, ServerMessage};

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
///
/// Identity arrives in the first `join` frame; authentication is the login
/// service's job and happens before the client gets here.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut sender, mut receiver) = socket.split();
    let (mut session, mut events) = ConnectionSession::open(state.hub.clone());
    let connection_id = session.connection_id();

    let connected = ServerMessage::connected(connection_id, Timestamp::now());
    if let Err(e) = send_message(&mut sender, &connected).await {
        tracing::debug!(connection_id = %connection_id, "Failed to send connected message: {}", e);
        session.close().await;
        return;
    }

    // Writer: drains this connection's queue onto the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let msg = ServerMessage::from(event);
            if let Err(e) = send_message(&mut sender, &msg).await {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Send error, closing connection: {}",
                    e
                );
                break;
            }
        }
    });

    // Reader: owns the session and hands it back when the client goes away.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => dispatch(&mut session, &text).await,
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        "Received unsupported binary message"
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level; axum answers pings itself.
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
            }
        }
        session
    });

    tokio::select! {
        _ = &mut send_task => {
            // Aborting drops the session, whose Drop disconnects it.
            recv_task.abort();
        }
        result = &mut recv_task => {
            send_task.abort();
            if let Ok(session) = result {
                session.close().await;
            }
        }
    }

    tracing::debug!(connection_id = %connection_id, "Connection closed");
}

/// Applies one text frame to the session. Malformed frames are logged and
/// dropped; they never close the connection.
pub(crate) async fn dispatch(session: &mut ConnectionSession, text: &str) {
    let connection_id = session.connection_id();

    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(connection_id = %connection_id, error = %e, "Ignoring malformed frame");
            return;
        }
    };

    match message {
        ClientMessage::Join {
            room_id,
            user_id,
            username,
        } => {
            let parsed = RoomId::new(room_id)
                .and_then(|room| Identity::parse(&user_id, &username).map(|identity| (room, identity)));
            match parsed {
                Ok((room_id, identity)) => {
                    if let Err(e) = session.join(room_id, identity).await {
                        tracing::warn!(connection_id = %connection_id, error = %e, "Join rejected");
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Invalid join");
                }
            }
        }
        ClientMessage::Leave { room_id } => match RoomId::new(room_id) {
            Ok(room_id) => {
                if let Err(e) = session.leave(&room_id).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Leave ignored");
                }
            }
            Err(e) => tracing::warn!(connection_id = %connection_id, error = %e, "Invalid leave"),
        },
        ClientMessage::Send { room_id, content } => match RoomId::new(room_id) {
            Ok(room_id) => {
                if let Err(e) = session.send(&room_id, content).await {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Send ignored");
                }
            }
            Err(e) => tracing::warn!(connection_id = %connection_id, error = %e, "Invalid send"),
        },
        ClientMessage::Ping => session.ping(),
    }
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

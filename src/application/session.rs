//! Per-connection session state.
//!
//! A session remembers who is behind a connection and which room it is in,
//! and turns client intents into hub calls. The transport owns exactly one
//! session per socket.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::chat::Identity;
use crate::domain::foundation::{ConnectionId, RoomId};

use super::events::HubEvent;
use super::hub::RoomHub;

/// Client intents the session refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("connection is already bound to user '{bound}'")]
    IdentityMismatch { bound: String },

    #[error("connection has not joined a room")]
    NotJoined,

    #[error("connection is in room '{current}', not '{requested}'")]
    WrongRoom { current: String, requested: String },
}

pub struct ConnectionSession {
    hub: Arc<RoomHub>,
    connection_id: ConnectionId,
    identity: Option<Identity>,
    current_room: Option<RoomId>,
    closed: bool,
}

impl ConnectionSession {
    /// Registers a connection with the hub.
    pub fn open(hub: Arc<RoomHub>) -> (Self, mpsc::Receiver<HubEvent>) {
        let (connection_id, events) = hub.connect();
        let session = Self {
            hub,
            connection_id,
            identity: None,
            current_room: None,
            closed: false,
        };
        (session, events)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn current_room(&self) -> Option<&RoomId> {
        self.current_room.as_ref()
    }

    /// Joins `room_id`, leaving the current room first.
    ///
    /// The identity is fixed by the first join; later joins must repeat it.
    pub async fn join(&mut self, room_id: RoomId, identity: Identity) -> Result<(), SessionError> {
        if let Some(bound) = &self.identity {
            if bound.user_id != identity.user_id {
                return Err(SessionError::IdentityMismatch {
                    bound: bound.user_id.to_string(),
                });
            }
        }

        if let Some(previous) = self.current_room.take() {
            if previous != room_id {
                self.hub
                    .handle_leave(self.connection_id, &previous, &identity.user_id)
                    .await;
            }
        }

        self.hub
            .handle_join(
                self.connection_id,
                room_id.clone(),
                identity.user_id.clone(),
                identity.username.clone(),
            )
            .await;

        self.identity = Some(identity);
        self.current_room = Some(room_id);
        Ok(())
    }

    pub async fn leave(&mut self, room_id: &RoomId) -> Result<(), SessionError> {
        let identity = self.identity.as_ref().ok_or(SessionError::NotJoined)?;
        self.hub
            .handle_leave(self.connection_id, room_id, &identity.user_id)
            .await;

        if self.current_room.as_ref() == Some(room_id) {
            self.current_room = None;
        }
        Ok(())
    }

    /// Sends `content` to the current room, which must be `room_id`.
    pub async fn send(&self, room_id: &RoomId, content: String) -> Result<(), SessionError> {
        let (identity, current) = match (&self.identity, &self.current_room) {
            (Some(identity), Some(current)) => (identity, current),
            _ => return Err(SessionError::NotJoined),
        };
        if current != room_id {
            return Err(SessionError::WrongRoom {
                current: current.to_string(),
                requested: room_id.to_string(),
            });
        }

        self.hub
            .handle_send(
                self.connection_id,
                room_id,
                identity.user_id.clone(),
                identity.username.clone(),
                content,
            )
            .await;
        Ok(())
    }

    pub fn ping(&self) {
        self.hub.handle_ping(self.connection_id);
    }

    /// Ends the session and removes the connection everywhere.
    pub async fn close(mut self) {
        self.closed = true;
        self.hub.handle_disconnect(self.connection_id).await;
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Dropped without close(), e.g. the socket task was aborted.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let hub = Arc::clone(&self.hub);
            let connection_id = self.connection_id;
            handle.spawn(async move {
                hub.handle_disconnect(connection_id).await;
            });
        }
    }
}

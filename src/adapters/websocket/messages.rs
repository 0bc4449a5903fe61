//! WebSocket message types for the chat relay.
//!
//! Defines the protocol between server and connected clients:
//! - Client → Server: join, leave, send, ping
//! - Server → Client: connection status, presence, messages, moderation
//!   notices, pongs

use serde::{Deserialize, Serialize};

use crate::application::{HubEvent, OnlineUser};
use crate::domain::foundation::Timestamp;

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Socket upgraded; tells the client its connection id.
    Connected(ConnectedMessage),

    #[serde(rename = "presence.updated")]
    PresenceUpdated(PresenceUpdatedMessage),

    #[serde(rename = "message.delivered")]
    MessageDelivered(MessageDeliveredMessage),

    #[serde(rename = "message.warning")]
    MessageWarning(MessageWarningMessage),

    #[serde(rename = "message.blocked")]
    MessageBlocked(MessageBlockedMessage),

    #[serde(rename = "room.peerJoined")]
    PeerJoined(PeerJoinedMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdatedMessage {
    pub room_id: String,
    pub users: Vec<PresenceUser>,
}

/// One online user. `id` is the connection id of the entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeliveredMessage {
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWarningMessage {
    pub reason: String,
    pub strike_count: u32,
    pub strikes_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBlockedMessage {
    pub reason: String,
    pub muted_until: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerJoinedMessage {
    pub room_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn connected(connection_id: impl ToString, at: Timestamp) -> Self {
        ServerMessage::Connected(ConnectedMessage {
            connection_id: connection_id.to_string(),
            timestamp: at.to_rfc3339(),
        })
    }
}

impl From<OnlineUser> for PresenceUser {
    fn from(user: OnlineUser) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.into(),
            color: user.color,
        }
    }
}

impl From<HubEvent> for ServerMessage {
    fn from(event: HubEvent) -> Self {
        match event {
            HubEvent::PresenceUpdated { room_id, users } => {
                ServerMessage::PresenceUpdated(PresenceUpdatedMessage {
                    room_id: room_id.into(),
                    users: users.into_iter().map(PresenceUser::from).collect(),
                })
            }
            HubEvent::MessageDelivered {
                room_id,
                user_id,
                username,
                content,
                timestamp,
                color,
            } => ServerMessage::MessageDelivered(MessageDeliveredMessage {
                room_id: room_id.into(),
                user_id: user_id.into(),
                username: username.into(),
                content,
                timestamp: timestamp.to_rfc3339(),
                color,
            }),
            HubEvent::MessageWarning {
                reason,
                strike_count,
                strikes_remaining,
            } => ServerMessage::MessageWarning(MessageWarningMessage {
                reason,
                strike_count,
                strikes_remaining,
            }),
            HubEvent::MessageBlocked {
                reason,
                muted_until,
            } => ServerMessage::MessageBlocked(MessageBlockedMessage {
                reason,
                muted_until: muted_until.to_rfc3339(),
            }),
            HubEvent::PeerJoined { room_id, username } => {
                ServerMessage::PeerJoined(PeerJoinedMessage {
                    room_id: room_id.into(),
                    username: username.into(),
                })
            }
            HubEvent::Pong { timestamp } => ServerMessage::Pong(PongMessage {
                timestamp: timestamp.to_rfc3339(),
            }),
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
///
/// Missing string fields decode as empty and are rejected by validation,
/// so a frame with a blank `roomId` is logged rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        username: String,
    },

    #[serde(rename_all = "camelCase")]
    Leave {
        #[serde(default)]
        room_id: String,
    },

    #[serde(rename_all = "camelCase")]
    Send {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        content: String,
    },

    /// Heartbeat request.
    Ping,
}

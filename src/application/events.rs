//! Events the hub produces for connected clients.
//!
//! The transport adapter turns these into wire messages; see
//! `adapters::websocket::messages`.

use crate::domain::foundation::{ConnectionId, RoomId, Timestamp, UserId, Username};

/// One user in a `PresenceUpdated` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    /// Connection identifier of the entry.
    pub id: ConnectionId,
    pub username: Username,
    pub color: Option<String>,
}

/// Event queued for delivery to a single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// Room membership changed; full list, oldest joiner first.
    PresenceUpdated {
        room_id: RoomId,
        users: Vec<OnlineUser>,
    },

    /// A message was accepted for the room.
    MessageDelivered {
        room_id: RoomId,
        user_id: UserId,
        username: Username,
        content: String,
        timestamp: Timestamp,
        color: Option<String>,
    },

    /// Sender's message matched a banned word; sender only.
    MessageWarning {
        reason: String,
        strike_count: u32,
        strikes_remaining: u32,
    },

    /// Sender is muted and the message was dropped; sender only.
    MessageBlocked {
        reason: String,
        muted_until: Timestamp,
    },

    /// Someone new entered the room; existing members only.
    PeerJoined { room_id: RoomId, username: Username },

    /// Heartbeat response.
    Pong { timestamp: Timestamp },
}

impl HubEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HubEvent::PresenceUpdated { .. } => "presence.updated",
            HubEvent::MessageDelivered { .. } => "message.delivered",
            HubEvent::MessageWarning { .. } => "message.warning",
            HubEvent::MessageBlocked { .. } => "message.blocked",
            HubEvent::PeerJoined { .. } => "room.peerJoined",
            HubEvent::Pong { .. } => "pong",
        }
    }
}

pub const WARNING_REASON: &str = "Your message contains a banned word";
pub const MUTED_REASON: &str = "You are muted";

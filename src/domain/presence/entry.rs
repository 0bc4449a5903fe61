//! Presence value types.

use serde::Serialize;

use crate::domain::foundation::{ConnectionId, RoomId, UserId, Username};

/// One user's presence in one room, bound to the connection that put it
/// there. At most one entry exists per `(room_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: Username,
    pub connection_id: ConnectionId,
}

/// A line of a presence snapshot.
///
/// `id` is the connection identifier, not the stable user id; clients key
/// their online list on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentUser {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub username: Username,
}

impl From<&PresenceEntry> for PresentUser {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            id: entry.connection_id,
            user_id: entry.user_id.clone(),
            username: entry.username.clone(),
        }
    }
}

/// Who is online in a room, oldest joiner first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub room_id: RoomId,
    pub users: Vec<PresentUser>,
}

impl PresenceSnapshot {
    pub fn empty(room_id: RoomId) -> Self {
        Self {
            room_id,
            users: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Usernames in snapshot order.
    pub fn usernames(&self) -> Vec<&str> {
        self.users.iter().map(|u| u.username.as_str()).collect()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.users.iter().map(|u| u.id).collect()
    }
}

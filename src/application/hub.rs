//! RoomHub - the realtime orchestrator.
//!
//! Binds connection lifecycle events to presence and moderation, then fans
//! the results out to the affected room.
//!
//! ```text
//!  session ──join/leave/send/disconnect──▶ RoomHub
//!                                           │ lock room
//!                                           ├─▶ PresenceRegistry
//!                                           ├─▶ ModerationState
//!                                           ├─▶ ConnectionDirectory (try_send per member)
//!                                           │ unlock room
//!                                           └─▶ MessageStore (spawned, fire-and-forget)
//! ```
//!
//! Every event touching a room runs while holding that room's presence
//! lock, so all events for one room are applied and fanned out in a single
//! total order. Fanout only enqueues; network writes happen in each
//! connection's own writer task.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::chat::{validate_content, ChatMessage};
use crate::domain::foundation::{ConnectionId, RoomId, UserId, Username};
use crate::domain::moderation::{
    BannedPatternSet, HighlightedUsers, ModerationPolicy, ModerationState, ModerationVerdict,
};
use crate::domain::presence::{JoinOutcome, PresenceRegistry, PresenceSnapshot, RoomPresenceGuard};
use crate::ports::{Clock, MessageStore, StoredMessage};

use super::directory::{ConnectionDirectory, Delivery};
use super::events::{HubEvent, OnlineUser, MUTED_REASON, WARNING_REASON};

/// Tunables for a hub instance.
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub policy: ModerationPolicy,
    /// Longest accepted message, in characters.
    pub max_message_chars: usize,
    /// Per-connection outbound queue capacity.
    pub outbound_buffer: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            policy: ModerationPolicy::default(),
            max_message_chars: 2000,
            outbound_buffer: 256,
        }
    }
}

/// Owns rooms, presence and moderation for the whole process.
pub struct RoomHub {
    presence: PresenceRegistry,
    moderation: ModerationState,
    highlights: Arc<HighlightedUsers>,
    connections: ConnectionDirectory,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    max_message_chars: usize,
}

impl RoomHub {
    pub fn new(store: Arc<dyn MessageStore>, clock: Arc<dyn Clock>, settings: HubSettings) -> Self {
        Self {
            presence: PresenceRegistry::new(),
            moderation: ModerationState::new(Arc::new(BannedPatternSet::new()), settings.policy),
            highlights: Arc::new(HighlightedUsers::new()),
            connections: ConnectionDirectory::new(settings.outbound_buffer),
            store,
            clock,
            max_message_chars: settings.max_message_chars,
        }
    }

    /// Registers a new connection and returns its outbound event queue.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<HubEvent>) {
        let connection_id = ConnectionId::new();
        let events = self.connections.register(connection_id);
        tracing::debug!(connection_id = %connection_id, "Connection registered");
        (connection_id, events)
    }

    /// Puts the user into `room_id` on behalf of `connection_id`.
    ///
    /// A connection is in at most one room: any other room it still holds
    /// presence in is left first.
    pub async fn handle_join(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
        username: Username,
    ) {
        self.presence
            .remove_connection_except(&connection_id, Some(&room_id), |room, _| {
                self.announce_departure(connection_id, room)
            })
            .await;

        let joined_user = user_id.clone();
        let joined_name = username.clone();
        self.presence
            .join(&room_id, user_id, username, connection_id, |room, outcome| {
                self.purge_dead(room);
                let snapshot = room.snapshot();

                tracing::info!(
                    connection_id = %connection_id,
                    room_id = %room_id,
                    user_id = %joined_user,
                    online = snapshot.len(),
                    "User joined room"
                );

                self.broadcast_presence(&snapshot);
                if outcome == JoinOutcome::Entered {
                    let peers = snapshot
                        .users
                        .iter()
                        .filter(|u| u.user_id != joined_user)
                        .map(|u| u.id);
                    self.fanout(
                        peers,
                        HubEvent::PeerJoined {
                            room_id: room_id.clone(),
                            username: joined_name,
                        },
                    );
                }
            })
            .await;
    }

    /// Removes the user from `room_id` and tells the remaining members.
    ///
    /// Only an entry bound to this connection is removed; if the user has
    /// since rejoined from another connection the leave is a no-op.
    pub async fn handle_leave(&self, connection_id: ConnectionId, room_id: &RoomId, user_id: &UserId) {
        let left = self
            .presence
            .leave(room_id, user_id, &connection_id, |room, removed| {
                if removed.is_some() {
                    self.purge_dead(room);
                    self.broadcast_presence(&room.snapshot());
                }
                removed.is_some()
            })
            .await;

        if left {
            tracing::info!(
                connection_id = %connection_id,
                room_id = %room_id,
                user_id = %user_id,
                "User left room"
            );
        } else {
            tracing::debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                user_id = %user_id,
                "Leave ignored, no presence bound to this connection"
            );
        }
    }

    /// Moderates a message and, if allowed, fans it out and persists it.
    pub async fn handle_send(
        &self,
        connection_id: ConnectionId,
        room_id: &RoomId,
        user_id: UserId,
        username: Username,
        content: String,
    ) {
        if let Err(reason) = validate_content(&content, self.max_message_chars) {
            tracing::debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                %reason,
                "Dropping message"
            );
            return;
        }

        let room = self.presence.lock_room(room_id).await;
        if !room.contains_connection(&connection_id) {
            tracing::debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                "Dropping message from connection not present in room"
            );
            room.release().await;
            return;
        }

        let now = self.clock.now();
        let accepted = match self.moderation.check(&user_id, &content, now) {
            ModerationVerdict::Allowed => {
                let message = ChatMessage {
                    room_id: room_id.clone(),
                    user_id,
                    username,
                    content,
                    timestamp: now,
                };
                self.fanout(room.connections(), self.delivered_event(&message));
                Some(message)
            }
            ModerationVerdict::Warning {
                strike_count,
                strikes_remaining,
            } => {
                self.deliver(
                    &connection_id,
                    HubEvent::MessageWarning {
                        reason: WARNING_REASON.to_string(),
                        strike_count,
                        strikes_remaining,
                    },
                );
                None
            }
            ModerationVerdict::Blocked { muted_until } => {
                self.deliver(
                    &connection_id,
                    HubEvent::MessageBlocked {
                        reason: MUTED_REASON.to_string(),
                        muted_until,
                    },
                );
                None
            }
        };
        room.release().await;

        if let Some(message) = accepted {
            self.persist(&message);
        }
    }

    /// Drops a connection everywhere and updates every room it was in.
    ///
    /// Idempotent; a second call for the same connection does nothing.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let was_registered = self.connections.unregister(&connection_id);

        let rooms = self
            .presence
            .remove_connection(&connection_id, |room, _| {
                self.announce_departure(connection_id, room)
            })
            .await;

        if was_registered {
            tracing::debug!(
                connection_id = %connection_id,
                rooms = rooms.len(),
                "Connection disconnected"
            );
        }
    }

    /// Answers a heartbeat.
    pub fn handle_ping(&self, connection_id: ConnectionId) {
        self.deliver(
            &connection_id,
            HubEvent::Pong {
                timestamp: self.clock.now(),
            },
        );
    }

    /// Current presence for a room.
    pub async fn presence_snapshot(&self, room_id: &RoomId) -> PresenceSnapshot {
        self.presence.snapshot(room_id).await
    }

    pub fn patterns(&self) -> &Arc<BannedPatternSet> {
        self.moderation.patterns()
    }

    pub fn highlights(&self) -> &Arc<HighlightedUsers> {
        &self.highlights
    }

    pub fn moderation(&self) -> &ModerationState {
        &self.moderation
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub async fn room_count(&self) -> usize {
        self.presence.room_count().await
    }

    /// Tells a room's remaining members that `connection_id` is gone.
    fn announce_departure(&self, connection_id: ConnectionId, room: &mut RoomPresenceGuard<'_>) {
        self.purge_dead(room);
        self.broadcast_presence(&room.snapshot());
        tracing::info!(
            connection_id = %connection_id,
            room_id = %room.room_id(),
            "Connection removed from room"
        );
    }

    /// Drops entries whose session is gone before anything is broadcast.
    fn purge_dead(&self, room: &mut RoomPresenceGuard<'_>) {
        let removed = room.retain_live(|connection_id| self.connections.is_live(connection_id));
        for entry in removed {
            tracing::debug!(
                connection_id = %entry.connection_id,
                room_id = %entry.room_id,
                "Purged presence of dead connection"
            );
        }
    }

    fn broadcast_presence(&self, snapshot: &PresenceSnapshot) {
        let users = snapshot
            .users
            .iter()
            .map(|u| OnlineUser {
                id: u.id,
                username: u.username.clone(),
                color: self.highlights.color_for(&u.username),
            })
            .collect();
        self.fanout(
            snapshot.connection_ids(),
            HubEvent::PresenceUpdated {
                room_id: snapshot.room_id.clone(),
                users,
            },
        );
    }

    fn delivered_event(&self, message: &ChatMessage) -> HubEvent {
        HubEvent::MessageDelivered {
            room_id: message.room_id.clone(),
            user_id: message.user_id.clone(),
            username: message.username.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            color: self.highlights.color_for(&message.username),
        }
    }

    fn fanout(&self, targets: impl IntoIterator<Item = ConnectionId>, event: HubEvent) {
        for connection_id in targets {
            self.deliver(&connection_id, event.clone());
        }
    }

    fn deliver(&self, connection_id: &ConnectionId, event: HubEvent) {
        let kind = event.kind();
        if self.connections.deliver(connection_id, event) == Delivery::Gone {
            tracing::trace!(connection_id = %connection_id, event = kind, "Skipped delivery to closed connection");
        }
    }

    fn persist(&self, message: &ChatMessage) {
        let store = Arc::clone(&self.store);
        let stored = StoredMessage::from(message);
        tokio::spawn(async move {
            let room_id = stored.room_id.clone();
            if let Err(e) = store.store_message(stored).await {
                tracing::warn!(room_id = %room_id, error = %e, "Failed to persist message");
            }
        });
    }
}

//! Per-room presence registry.
//!
//! # Architecture
//!
//! ```text
//! rooms:             R1 ─▶ Mutex{ alice→c1, bob→c2 }
//!                    R2 ─▶ Mutex{ carol→c3 }
//!
//! connection_rooms:  c1 ─▶ {R1}   c2 ─▶ {R1}   c3 ─▶ {R2}
//! ```
//!
//! Each room has its own lock, so events for different rooms never contend.
//! The connection index lets a disconnect visit only the rooms that
//! connection is actually in.
//!
//! The registry-level operations take a callback that runs while the room
//! is still locked, so callers can broadcast the result before any other
//! event for that room is applied.
//!
//! # Lock ordering
//!
//! A room lock may be held while taking the index lock, never the reverse.
//! The index lock is never held across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::foundation::{ConnectionId, RoomId, UserId, Username};

use super::entry::{PresenceEntry, PresenceSnapshot, PresentUser};

/// Entries for one room, kept in join order.
#[derive(Debug, Default)]
struct RoomPresence {
    entries: IndexMap<UserId, PresenceEntry>,
}

impl RoomPresence {
    fn holds_connection(&self, connection_id: &ConnectionId) -> bool {
        self.entries
            .values()
            .any(|e| &e.connection_id == connection_id)
    }
}

type ConnectionIndex = HashMap<ConnectionId, HashSet<RoomId>>;

/// What a join did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user was not present before.
    Entered,
    /// The user was already present; the entry now points at the joining
    /// connection and keeps its place in the join order.
    Rebound,
}

/// Source of truth for "who is online" in every room.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<RoomPresence>>>>,
    connection_rooms: std::sync::Mutex<ConnectionIndex>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks a room for a sequence of reads and writes.
    ///
    /// While the guard is alive no other caller can observe or mutate the
    /// room, which is what gives the hub a single total order per room.
    /// Call [`RoomPresenceGuard::release`] when done so empty rooms are
    /// cleaned up.
    pub async fn lock_room(&self, room_id: &RoomId) -> RoomPresenceGuard<'_> {
        let existing = self.rooms.read().await.get(room_id).cloned();
        let room = match existing {
            Some(room) => room,
            None => self
                .rooms
                .write()
                .await
                .entry(room_id.clone())
                .or_default()
                .clone(),
        };

        RoomPresenceGuard {
            registry: self,
            room_id: room_id.clone(),
            room: room.lock_owned().await,
        }
    }

    /// Inserts or overwrites the entry for `(room_id, user_id)`, then runs
    /// `then` with the room still locked.
    pub async fn join<R>(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        username: Username,
        connection_id: ConnectionId,
        then: impl FnOnce(&mut RoomPresenceGuard<'_>, JoinOutcome) -> R,
    ) -> R {
        let mut room = self.lock_room(room_id).await;
        let outcome = room.join(user_id, username, connection_id);
        let result = then(&mut room, outcome);
        room.release().await;
        result
    }

    /// Removes the entry for `(room_id, user_id)` if it is bound to
    /// `connection_id`, then runs `then` with the room still locked.
    ///
    /// Absent entries are not an error; `then` receives `None`.
    pub async fn leave<R>(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        connection_id: &ConnectionId,
        then: impl FnOnce(&mut RoomPresenceGuard<'_>, Option<PresenceEntry>) -> R,
    ) -> R {
        let mut room = self.lock_room(room_id).await;
        let removed = room.leave(user_id, connection_id);
        let result = then(&mut room, removed);
        room.release().await;
        result
    }

    /// Removes every entry bound to `connection_id` and returns the rooms
    /// that lost a member.
    ///
    /// `on_room` runs once per affected room, with that room still locked.
    pub async fn remove_connection(
        &self,
        connection_id: &ConnectionId,
        on_room: impl FnMut(&mut RoomPresenceGuard<'_>, Vec<PresenceEntry>),
    ) -> Vec<RoomId> {
        self.remove_connection_except(connection_id, None, on_room)
            .await
    }

    /// Like [`remove_connection`](Self::remove_connection), but leaves the
    /// connection's entries in `keep` alone.
    pub async fn remove_connection_except(
        &self,
        connection_id: &ConnectionId,
        keep: Option<&RoomId>,
        mut on_room: impl FnMut(&mut RoomPresenceGuard<'_>, Vec<PresenceEntry>),
    ) -> Vec<RoomId> {
        let mut affected = Vec::new();
        for room_id in self.rooms_for_connection(connection_id) {
            if keep == Some(&room_id) {
                continue;
            }
            let mut room = self.lock_room(&room_id).await;
            let removed = room.remove_connection(connection_id);
            if !removed.is_empty() {
                on_room(&mut room, removed);
                affected.push(room_id);
            }
            room.release().await;
        }
        affected
    }

    /// Current snapshot for a room; empty if nobody is there.
    pub async fn snapshot(&self, room_id: &RoomId) -> PresenceSnapshot {
        let room = self.rooms.read().await.get(room_id).cloned();
        match room {
            Some(room) => snapshot_of(room_id, &*room.lock().await),
            None => PresenceSnapshot::empty(room_id.clone()),
        }
    }

    /// Rooms that currently hold an entry bound to `connection_id`,
    /// sorted for a stable locking order.
    pub fn rooms_for_connection(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .index()
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Number of rooms with at least one entry (or currently locked).
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    fn index(&self) -> MutexGuard<'_, ConnectionIndex> {
        self.connection_rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops the room's slot if it is empty and nobody else holds it.
    async fn prune(&self, room_id: &RoomId) {
        let mut rooms = self.rooms.write().await;
        let idle_and_empty = rooms.get(room_id).is_some_and(|room| {
            Arc::strong_count(room) == 1
                && room
                    .try_lock()
                    .map(|presence| presence.entries.is_empty())
                    .unwrap_or(false)
        });
        if idle_and_empty {
            rooms.remove(room_id);
        }
    }
}

/// Exclusive access to one room's presence.
pub struct RoomPresenceGuard<'a> {
    registry: &'a PresenceRegistry,
    room_id: RoomId,
    room: OwnedMutexGuard<RoomPresence>,
}

impl<'a> RoomPresenceGuard<'a> {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Inserts or overwrites the user's entry. An existing entry keeps its
    /// position in the join order but is rebound to `connection_id`.
    pub fn join(
        &mut self,
        user_id: UserId,
        username: Username,
        connection_id: ConnectionId,
    ) -> JoinOutcome {
        let entry = PresenceEntry {
            room_id: self.room_id.clone(),
            user_id: user_id.clone(),
            username,
            connection_id,
        };
        let replaced = self.room.entries.insert(user_id, entry);
        let outcome = if replaced.is_some() {
            JoinOutcome::Rebound
        } else {
            JoinOutcome::Entered
        };

        let mut index = self.registry.index();
        if let Some(previous) = replaced {
            if previous.connection_id != connection_id
                && !self.room.holds_connection(&previous.connection_id)
            {
                unindex(&mut index, &previous.connection_id, &self.room_id);
            }
        }
        index
            .entry(connection_id)
            .or_default()
            .insert(self.room_id.clone());

        outcome
    }

    /// Removes the user's entry if it is bound to `connection_id`.
    ///
    /// An entry rebound to a newer connection is left in place.
    pub fn leave(&mut self, user_id: &UserId, connection_id: &ConnectionId) -> Option<PresenceEntry> {
        let bound_here = self
            .room
            .entries
            .get(user_id)
            .is_some_and(|entry| &entry.connection_id == connection_id);
        if !bound_here {
            return None;
        }

        let removed = self.room.entries.shift_remove(user_id)?;
        if !self.room.holds_connection(&removed.connection_id) {
            unindex(&mut self.registry.index(), &removed.connection_id, &self.room_id);
        }
        Some(removed)
    }

    /// Removes every entry bound to `connection_id`.
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Vec<PresenceEntry> {
        let removed = self.extract(|entry| &entry.connection_id == connection_id);
        unindex(&mut self.registry.index(), connection_id, &self.room_id);
        removed
    }

    /// Removes entries whose connection fails `is_live`.
    pub fn retain_live(&mut self, is_live: impl Fn(&ConnectionId) -> bool) -> Vec<PresenceEntry> {
        let removed = self.extract(|entry| !is_live(&entry.connection_id));
        if !removed.is_empty() {
            let mut index = self.registry.index();
            for entry in &removed {
                if !self.room.holds_connection(&entry.connection_id) {
                    unindex(&mut index, &entry.connection_id, &self.room_id);
                }
            }
        }
        removed
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        snapshot_of(&self.room_id, &self.room)
    }

    /// Connections currently present, in join order.
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.room.entries.values().map(|e| e.connection_id).collect()
    }

    pub fn contains_connection(&self, connection_id: &ConnectionId) -> bool {
        self.room.holds_connection(connection_id)
    }

    pub fn entry(&self, user_id: &UserId) -> Option<&PresenceEntry> {
        self.room.entries.get(user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.room.entries.is_empty()
    }

    /// Unlocks the room and forgets it if it ended up empty.
    pub async fn release(self) {
        let RoomPresenceGuard {
            registry,
            room_id,
            room,
        } = self;
        let empty = room.entries.is_empty();
        drop(room);
        if empty {
            registry.prune(&room_id).await;
        }
    }

    fn extract(&mut self, matches: impl Fn(&PresenceEntry) -> bool) -> Vec<PresenceEntry> {
        let mut removed = Vec::new();
        self.room.entries.retain(|_, entry| {
            if matches(&*entry) {
                removed.push(entry.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

fn snapshot_of(room_id: &RoomId, room: &RoomPresence) -> PresenceSnapshot {
    PresenceSnapshot {
        room_id: room_id.clone(),
        users: room.entries.values().map(PresentUser::from).collect(),
    }
}

fn unindex(index: &mut ConnectionIndex, connection_id: &ConnectionId, room_id: &RoomId) {
    if let Some(rooms) = index.get_mut(connection_id) {
        rooms.remove(room_id);
        if rooms.is_empty() {
            index.remove(connection_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn room(id: &str) -> RoomId {
        RoomId::new(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn name(id: &str) -> Username {
        Username::new(id).unwrap()
    }

    async fn join(
        registry: &PresenceRegistry,
        room_id: &RoomId,
        id: &str,
        connection_id: ConnectionId,
    ) -> PresenceSnapshot {
        registry
            .join(room_id, user(id), name(id), connection_id, |room, _| room.snapshot())
            .await
    }

    async fn leave(
        registry: &PresenceRegistry,
        room_id: &RoomId,
        id: &str,
        connection_id: ConnectionId,
    ) -> PresenceSnapshot {
        registry
            .leave(room_id, &user(id), &connection_id, |room, _| room.snapshot())
            .await
    }

    #[tokio::test]
    async fn join_returns_snapshot_in_insertion_order() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        let first = join(&registry, &r1, "alice", c1).await;
        assert_eq!(first.usernames(), vec!["alice"]);
        assert_eq!(first.users[0].id, c1);

        let second = join(&registry, &r1, "bob", c2).await;
        assert_eq!(second.usernames(), vec!["alice", "bob"]);
        assert_eq!(second.connection_ids(), vec![c1, c2]);
    }

    #[tokio::test]
    async fn join_reports_entered_then_rebound() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        let first = registry
            .join(&r1, user("alice"), name("alice"), c1, |_, outcome| outcome)
            .await;
        let second = registry
            .join(&r1, user("alice"), name("alice"), c2, |_, outcome| outcome)
            .await;

        assert_eq!(first, JoinOutcome::Entered);
        assert_eq!(second, JoinOutcome::Rebound);
    }

    #[tokio::test]
    async fn rejoin_from_new_connection_overwrites_in_place() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (c1, c2, c3) = (ConnectionId::new(), ConnectionId::new(), ConnectionId::new());

        join(&registry, &r1, "alice", c1).await;
        join(&registry, &r1, "bob", c2).await;
        let snapshot = join(&registry, &r1, "alice", c3).await;

        assert_eq!(snapshot.usernames(), vec!["alice", "bob"]);
        assert_eq!(snapshot.users[0].id, c3);
        assert!(registry.rooms_for_connection(&c1).is_empty());
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let c1 = ConnectionId::new();

        join(&registry, &r1, "alice", c1).await;
        let snapshot = join(&registry, &r1, "alice", c1).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.rooms_for_connection(&c1), vec![r1]);
    }

    #[tokio::test]
    async fn leave_of_absent_user_is_noop() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let c1 = ConnectionId::new();
        join(&registry, &r1, "alice", c1).await;

        let snapshot = leave(&registry, &r1, "ghost", c1).await;
        assert_eq!(snapshot.usernames(), vec!["alice"]);

        let elsewhere = leave(&registry, &room("R2"), "alice", c1).await;
        assert!(elsewhere.is_empty());
    }

    #[tokio::test]
    async fn leave_hands_back_removed_entry() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let c1 = ConnectionId::new();
        join(&registry, &r1, "alice", c1).await;

        let removed = registry
            .leave(&r1, &user("alice"), &c1, |_, removed| removed)
            .await;

        assert_eq!(removed.map(|e| e.connection_id), Some(c1));
        assert!(registry.snapshot(&r1).await.is_empty());
    }

    #[tokio::test]
    async fn leave_from_stale_connection_keeps_rebound_entry() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (old, new) = (ConnectionId::new(), ConnectionId::new());
        join(&registry, &r1, "alice", old).await;
        join(&registry, &r1, "alice", new).await;

        let snapshot = leave(&registry, &r1, "alice", old).await;

        assert_eq!(snapshot.connection_ids(), vec![new]);
    }

    #[tokio::test]
    async fn remove_connection_only_touches_its_rooms() {
        let registry = PresenceRegistry::new();
        let (r1, r2, r3) = (room("R1"), room("R2"), room("R3"));
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());

        join(&registry, &r1, "alice", c1).await;
        join(&registry, &r2, "alice", c1).await;
        join(&registry, &r2, "bob", c2).await;
        join(&registry, &r3, "bob", c2).await;

        let mut visited = Vec::new();
        let affected = registry
            .remove_connection(&c1, |room, removed| {
                visited.push((room.room_id().clone(), removed.len(), room.snapshot().len()));
            })
            .await;

        assert_eq!(affected, vec![r1.clone(), r2.clone()]);
        assert_eq!(visited, vec![(r1.clone(), 1, 0), (r2.clone(), 1, 1)]);
        assert!(registry.snapshot(&r1).await.is_empty());
        assert_eq!(registry.snapshot(&r2).await.usernames(), vec!["bob"]);
        assert_eq!(registry.snapshot(&r3).await.usernames(), vec!["bob"]);
        assert!(registry.rooms_for_connection(&c1).is_empty());
    }

    #[tokio::test]
    async fn remove_connection_except_keeps_named_room() {
        let registry = PresenceRegistry::new();
        let (r1, r2) = (room("R1"), room("R2"));
        let c1 = ConnectionId::new();
        join(&registry, &r1, "alice", c1).await;
        join(&registry, &r2, "alice", c1).await;

        let affected = registry
            .remove_connection_except(&c1, Some(&r2), |_, _| {})
            .await;

        assert_eq!(affected, vec![r1.clone()]);
        assert_eq!(registry.rooms_for_connection(&c1), vec![r2]);
    }

    #[tokio::test]
    async fn remove_connection_spares_entry_rebound_elsewhere() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (old, new) = (ConnectionId::new(), ConnectionId::new());

        join(&registry, &r1, "alice", old).await;
        join(&registry, &r1, "alice", new).await;

        assert!(registry.remove_connection(&old, |_, _| {}).await.is_empty());
        assert_eq!(registry.snapshot(&r1).await.connection_ids(), vec![new]);
    }

    #[tokio::test]
    async fn empty_rooms_are_pruned() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let c1 = ConnectionId::new();

        join(&registry, &r1, "alice", c1).await;
        assert_eq!(registry.room_count().await, 1);

        leave(&registry, &r1, "alice", c1).await;
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn retain_live_drops_dead_connections() {
        let registry = PresenceRegistry::new();
        let r1 = room("R1");
        let (live, dead) = (ConnectionId::new(), ConnectionId::new());
        join(&registry, &r1, "alice", live).await;
        join(&registry, &r1, "bob", dead).await;

        let mut guard = registry.lock_room(&r1).await;
        let removed = guard.retain_live(|c| *c == live);
        assert_eq!(removed.len(), 1);
        assert_eq!(guard.snapshot().usernames(), vec!["alice"]);
        guard.release().await;

        assert!(registry.rooms_for_connection(&dead).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Join { room: u8, user: u8 },
        Leave { room: u8, user: u8 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..3, 0u8..5).prop_map(|(room, user)| Op::Join { room, user }),
            (0u8..3, 0u8..5).prop_map(|(room, user)| Op::Leave { room, user }),
        ]
    }

    proptest! {
        #[test]
        fn snapshot_matches_net_joins(ops in proptest::collection::vec(op(), 0..60)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let registry = PresenceRegistry::new();
                // One connection per user, as a single client would hold.
                let connections: Vec<ConnectionId> = (0..5).map(|_| ConnectionId::new()).collect();
                let mut model: HashMap<u8, Vec<u8>> = HashMap::new();

                for op in &ops {
                    match *op {
                        Op::Join { room: r, user: u } => {
                            let id = format!("u{}", u);
                            join(&registry, &room(&format!("R{}", r)), &id, connections[u as usize]).await;
                            let members = model.entry(r).or_default();
                            if !members.contains(&u) {
                                members.push(u);
                            }
                        }
                        Op::Leave { room: r, user: u } => {
                            let id = format!("u{}", u);
                            leave(&registry, &room(&format!("R{}", r)), &id, connections[u as usize]).await;
                            model.entry(r).or_default().retain(|m| *m != u);
                        }
                    }
                }

                for r in 0u8..3 {
                    let expected: Vec<String> = model
                        .get(&r)
                        .map(|m| m.iter().map(|u| format!("u{}", u)).collect())
                        .unwrap_or_default();
                    let actual: Vec<String> = registry
                        .snapshot(&room(&format!("R{}", r)))
                        .await
                        .usernames()
                        .into_iter()
                        .map(String::from)
                        .collect();
                    assert_eq!(actual, expected);
                }
            });
        }
    }
}

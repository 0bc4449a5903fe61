//! Presence tracking: who is online in which room.

mod entry;
mod registry;

pub use entry::{PresenceEntry, PresenceSnapshot, PresentUser};
pub use registry::{JoinOutcome, PresenceRegistry, RoomPresenceGuard};

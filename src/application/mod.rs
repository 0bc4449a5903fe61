//! Application layer - orchestrates the domain behind each connection.
//!
//! - [`RoomHub`] applies join/leave/send/disconnect events and fans out results
//! - [`ConnectionSession`] tracks identity and room for one connection
//! - [`ConnectionDirectory`] holds each connection's outbound queue

mod directory;
mod events;
mod hub;
mod session;

pub use directory::{ConnectionDirectory, Delivery};
pub use events::{HubEvent, OnlineUser, MUTED_REASON, WARNING_REASON};
pub use hub::{HubSettings, RoomHub};
pub use session::{ConnectionSession, SessionError};

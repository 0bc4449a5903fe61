//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and validation errors that form the
//! vocabulary of the chat relay.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConnectionId, RoomId, UserId, Username};
pub use timestamp::Timestamp;

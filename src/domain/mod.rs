//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `chat` - Identities and in-flight messages
//! - `moderation` - Banned-word strikes, mutes and highlighted users
//! - `presence` - Per-room online lists

pub mod chat;
pub mod foundation;
pub mod moderation;
pub mod presence;

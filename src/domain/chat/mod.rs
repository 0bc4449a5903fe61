//! Chat identities and messages.

mod identity;
mod message;

pub use identity::Identity;
pub use message::{validate_content, ChatMessage};

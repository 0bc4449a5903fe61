//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the outside world. Adapters implement these ports.
//!
//! - `MessageStore` - Durable storage of accepted messages
//! - `ModerationListSource` - Banned words and highlighted users
//! - `Clock` - Current time

mod clock;
mod message_store;
mod moderation_source;

pub use clock::Clock;
pub use message_store::{MessageStore, PersistenceError, StoredMessage};
pub use moderation_source::ModerationListSource;

//! Persistence collaborator adapters.
//!
//! - [`HttpPersistenceClient`] - REST backend (messages, banned words, highlights)
//! - [`InMemoryMessageStore`] / [`StaticModerationLists`] - in-process fallbacks
//! - [`ModerationListRefresher`] - periodic list reload task

mod http_client;
mod in_memory;
mod refresher;

pub use http_client::{HttpPersistenceClient, HttpPersistenceConfig};
pub use in_memory::{InMemoryMessageStore, StaticModerationLists};
pub use refresher::{ModerationListRefresher, RefreshOutcome};

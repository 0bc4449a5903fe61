//! ModerationListSource port - admin-managed moderation lists.
//!
//! The persistence collaborator owns the banned-word and highlighted-user
//! lists; the relay only pulls fresh copies on a timer.

use std::collections::HashMap;

use async_trait::async_trait;

use super::message_store::PersistenceError;

/// Port for fetching the current moderation lists.
///
/// A reload either returns the complete list or an error; partial lists
/// must never be returned.
#[async_trait]
pub trait ModerationListSource: Send + Sync {
    /// Current banned substrings.
    async fn banned_patterns(&self) -> Result<Vec<String>, PersistenceError>;

    /// Current `username -> color` highlights.
    async fn highlighted_users(&self) -> Result<HashMap<String, String>, PersistenceError>;
}

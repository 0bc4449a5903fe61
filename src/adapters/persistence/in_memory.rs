//! In-process persistence adapters.
//!
//! Used when no REST backend is configured, and as recorders in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{MessageStore, ModerationListSource, PersistenceError, StoredMessage};

/// Keeps accepted messages in memory.
///
/// With a limit, only the most recent `limit` messages are kept.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<VecDeque<StoredMessage>>,
    limit: Option<usize>,
    attempts: AtomicUsize,
    fail: bool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that keeps at most `limit` messages.
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Store whose every write fails with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Messages stored so far, oldest first.
    pub fn stored(&self) -> Vec<StoredMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of `store_message` calls, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Waits (up to about a second) until `count` messages are stored.
    pub async fn wait_for(&self, count: usize) {
        self.wait_until(|| self.stored().len() >= count).await;
    }

    /// Waits (up to about a second) until `count` writes were attempted.
    pub async fn wait_for_attempts(&self, count: usize) {
        self.wait_until(|| self.attempts() >= count).await;
    }

    async fn wait_until(&self, done: impl Fn() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn store_message(&self, message: StoredMessage) -> Result<(), PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PersistenceError::Unavailable);
        }

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push_back(message);
        if let Some(limit) = self.limit {
            while messages.len() > limit {
                messages.pop_front();
            }
        }
        Ok(())
    }
}

/// Moderation lists fixed at startup, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticModerationLists {
    banned: Vec<String>,
    highlights: HashMap<String, String>,
}

impl StaticModerationLists {
    pub fn new(banned: Vec<String>, highlights: HashMap<String, String>) -> Self {
        Self { banned, highlights }
    }

    /// Banned words from a comma separated list; blanks are skipped.
    pub fn from_csv(banned_words: &str) -> Self {
        let banned = banned_words
            .split(',')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();
        Self {
            banned,
            highlights: HashMap::new(),
        }
    }
}

#[async_trait]
impl ModerationListSource for StaticModerationLists {
    async fn banned_patterns(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.banned.clone())
    }

    async fn highlighted_users(&self) -> Result<HashMap<String, String>, PersistenceError> {
        Ok(self.highlights.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{RoomId, UserId, Username};

    fn message(content: &str) -> StoredMessage {
        StoredMessage {
            room_id: RoomId::new("R1").unwrap(),
            user_id: UserId::new("u1").unwrap(),
            username: Username::new("alice").unwrap(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn records_messages_in_order() {
        let store = InMemoryMessageStore::new();
        store.store_message(message("one")).await.unwrap();
        store.store_message(message("two")).await.unwrap();

        let contents: Vec<_> = store.stored().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert_eq!(store.attempts(), 2);
    }

    #[tokio::test]
    async fn bounded_store_keeps_most_recent() {
        let store = InMemoryMessageStore::bounded(2);
        for content in ["a", "b", "c"] {
            store.store_message(message(content)).await.unwrap();
        }

        let contents: Vec<_> = store.stored().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn failing_store_counts_attempts() {
        let store = InMemoryMessageStore::failing();
        let result = store.store_message(message("x")).await;

        assert!(matches!(result, Err(PersistenceError::Unavailable)));
        assert_eq!(store.attempts(), 1);
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn static_lists_parse_csv() {
        let lists = StaticModerationLists::from_csv(" spam, ,eggs ,");
        assert_eq!(lists.banned_patterns().await.unwrap(), vec!["spam", "eggs"]);
        assert!(lists.highlighted_users().await.unwrap().is_empty());
    }
}

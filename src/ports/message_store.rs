//! MessageStore port - durable storage of accepted chat messages.
//!
//! The hub calls this after fanning a message out. Storage is
//! fire-and-forget from the hub's point of view: a failure is logged and
//! never reaches the sender.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::{RoomId, UserId, Username};

/// Message payload handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: Username,
    pub content: String,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            room_id: message.room_id.clone(),
            user_id: message.user_id.clone(),
            username: message.username.clone(),
            content: message.content.clone(),
        }
    }
}

/// Errors raised by persistence collaborator adapters.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Request could not be sent or the connection failed
    #[error("Persistence transport error: {0}")]
    Transport(String),

    /// Collaborator answered with a non-success status
    #[error("Persistence service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode persistence response: {0}")]
    Decode(String),

    /// Collaborator is not reachable or not configured
    #[error("Persistence service unavailable")]
    Unavailable,
}

/// Port for storing accepted messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores one message.
    async fn store_message(&self, message: StoredMessage) -> Result<(), PersistenceError>;
}

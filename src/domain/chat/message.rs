//! In-flight chat messages.

use serde::Serialize;

use crate::domain::foundation::{RoomId, Timestamp, UserId, Username, ValidationError};

/// A message accepted for a room. Not assigned an id here; the storage
/// collaborator owns identity and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: Username,
    pub content: String,
    pub timestamp: Timestamp,
}

/// Validates message text: rejects whitespace-only content and anything
/// longer than `max_chars` characters.
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::empty_field("content"));
    }
    let chars = content.chars().count();
    if chars > max_chars {
        return Err(ValidationError::too_long("content", max_chars, chars));
    }
    Ok(())
}

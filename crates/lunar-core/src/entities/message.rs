//! Message entity - a durable chat message within a room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::value_objects::MessageStamp;

/// Maximum message length, counted in characters
pub const MAX_CONTENT_LENGTH: usize = 5000;

/// Denormalized sender snapshot carried on every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Message entity
///
/// Serializes to the wire shape shared by the realtime `new_message` event
/// and the history endpoint: `{id, roomId, content, sender, createdAt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub content: String,
    pub sender: MessageSender,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Compose a new message from a freshly generated stamp.
    ///
    /// Content is validated before anything is built, so an invalid
    /// message never receives an identity.
    pub fn compose(
        stamp: MessageStamp,
        room_id: Uuid,
        sender: MessageSender,
        content: String,
    ) -> Result<Self, DomainError> {
        validate_content(&content)?;
        Ok(Self {
            id: stamp.id,
            room_id,
            content,
            sender,
            created_at: stamp.created_at,
        })
    }

    #[inline]
    pub fn sender_id(&self) -> Uuid {
        self.sender.id
    }

    /// Ordering key used by history pagination (newest first)
    #[inline]
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

/// Validate message content: non-blank and at most [`MAX_CONTENT_LENGTH`] characters
pub fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::EmptyContent);
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(DomainError::ContentTooLong {
            max: MAX_CONTENT_LENGTH,
        });
    }
    Ok(())
}

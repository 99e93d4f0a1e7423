//! Opaque pagination cursor for message history

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::Message;
use crate::error::DomainError;

/// Position in a room's history: the last message of the previous page.
///
/// Encoded as base64 over `{"id": ..., "createdAt": ...}` with the
/// timestamp in RFC 3339 at nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCursor {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl MessageCursor {
    pub fn new(id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self { id, created_at }
    }

    pub fn from_message(message: &Message) -> Self {
        Self::new(message.id, message.created_at)
    }

    /// Encode into the URL-safe token handed to clients
    pub fn encode(&self) -> String {
        let json = serde_json::json!({
            "id": self.id,
            "createdAt": self.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    /// Decode a client-supplied token. Standard-alphabet tokens are accepted too.
    pub fn decode(token: &str) -> Result<Self, DomainError> {
        let token = token.trim();
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .or_else(|_| STANDARD.decode(token))
            .map_err(|_| DomainError::InvalidCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| DomainError::InvalidCursor)
    }

    /// True when `message` sorts strictly after this cursor in newest-first order
    pub fn is_before(&self, message: &Message) -> bool {
        message.sort_key() < (self.created_at, self.id)
    }
}

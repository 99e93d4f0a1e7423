//! History page sizing and assembly

use serde::Serialize;

use super::MessageCursor;
use crate::entities::Message;

/// Page size used when the client omits or garbles `limit`
pub const DEFAULT_PAGE_SIZE: u32 = 32;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalize a raw `limit` query value.
///
/// Missing, unparsable, zero, or out-of-range values fall back to
/// `fallback` rather than being clamped.
pub fn normalize_limit(raw: Option<&str>, max: u32, fallback: u32) -> u32 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| (1..=max).contains(n))
        .unwrap_or(fallback)
}

/// One page of history, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl MessagePage {
    /// Build a page. A full page yields a cursor pointing at its last message.
    pub fn new(messages: Vec<Message>, limit: u32) -> Self {
        let next_cursor = if !messages.is_empty() && messages.len() >= limit as usize {
            messages
                .last()
                .map(|last| MessageCursor::from_message(last).encode())
        } else {
            None
        };
        Self {
            messages,
            next_cursor,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

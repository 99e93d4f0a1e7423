//! Message row -> entity mapper

use lunar_core::entities::{Message, MessageSender};

use crate::models::MessageRow;

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            room_id: row.room_id,
            content: row.content,
            sender: MessageSender {
                id: row.sender_id,
                username: row.sender_username,
                avatar_url: row.sender_avatar_url,
            },
            created_at: row.created_at,
        }
    }
}

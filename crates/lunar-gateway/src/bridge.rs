//! Message persistence bridge
//!
//! Turns a client's chat frame into a durable message. A message is
//! returned only once the store has accepted it, which is what makes
//! persist-then-publish hold for every caller.

use std::sync::Arc;

use lunar_common::MessagesConfig;
use lunar_core::{
    normalize_limit, DomainError, Message, MessageCursor, MessageIdGenerator, MessagePage,
    MessageRepository, MessageSender, MAX_CONTENT_LENGTH, MAX_PAGE_SIZE,
};
use tracing::instrument;
use uuid::Uuid;

pub struct MessageBridge {
    messages: Arc<dyn MessageRepository>,
    ids: MessageIdGenerator,
    limits: MessagesConfig,
}

impl MessageBridge {
    pub fn new(messages: Arc<dyn MessageRepository>, limits: MessagesConfig) -> Self {
        Self {
            messages,
            ids: MessageIdGenerator::new(),
            limits,
        }
    }

    /// Effective content limit: the configured one, never above the hard ceiling
    fn max_content_length(&self) -> usize {
        self.limits.max_content_length.min(MAX_CONTENT_LENGTH)
    }

    /// Validate, stamp and persist a chat message
    #[instrument(skip(self, sender, content), fields(sender_id = %sender.id, len = content.len()))]
    pub async fn ingest(
        &self,
        room_id: Uuid,
        sender: &MessageSender,
        content: String,
    ) -> Result<Message, DomainError> {
        let max = self.max_content_length();
        if content.chars().count() > max {
            return Err(DomainError::ContentTooLong { max });
        }

        let message = Message::compose(self.ids.next(), room_id, sender.clone(), content)?;
        self.messages.create(&message).await?;

        tracing::debug!(message_id = %message.id, "Message persisted");
        Ok(message)
    }

    /// One page of a room's history, newest first
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        room_id: Uuid,
        limit: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<MessagePage, DomainError> {
        let max = self.limits.max_page_size.clamp(1, MAX_PAGE_SIZE);
        let limit = normalize_limit(limit, max, self.limits.default_page_size.clamp(1, max));
        let cursor = cursor
            .filter(|c| !c.trim().is_empty())
            .map(MessageCursor::decode)
            .transpose()?;

        let messages = self
            .messages
            .list_paged(room_id, limit, cursor.as_ref())
            .await?;
        Ok(MessagePage::new(messages, limit))
    }
}

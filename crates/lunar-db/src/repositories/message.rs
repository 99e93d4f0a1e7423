//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use lunar_core::entities::Message;
use lunar_core::error::DomainError;
use lunar_core::traits::{MessageRepository, RepoResult};
use lunar_core::value_objects::{MessageCursor, MAX_PAGE_SIZE};

use crate::models::MessageRow;

use super::error::{map_db_error, map_foreign_key_violation};

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(message_id = %message.id, room_id = %message.room_id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.sender_id())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_foreign_key_violation(e, |constraint| match constraint {
                Some("messages_sender_id_fkey") => DomainError::UserNotFound(message.sender_id()),
                _ => DomainError::RoomNotFound(message.room_id.to_string()),
            })
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_paged(
        &self,
        room_id: Uuid,
        limit: u32,
        cursor: Option<&MessageCursor>,
    ) -> RepoResult<Vec<Message>> {
        let limit = i64::from(limit.clamp(1, MAX_PAGE_SIZE));

        let rows = match cursor {
            Some(cursor) => {
                // Strictly older than the last message of the previous page
                sqlx::query_as::<_, MessageRow>(
                    r#"
                    SELECT m.id, m.room_id, m.content, m.created_at,
                           u.id AS sender_id, u.username AS sender_username,
                           u.avatar_url AS sender_avatar_url
                    FROM messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.room_id = $1 AND (m.created_at, m.id) < ($2, $3)
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $4
                    "#,
                )
                .bind(room_id)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MessageRow>(
                    r#"
                    SELECT m.id, m.room_id, m.content, m.created_at,
                           u.id AS sender_id, u.username AS sender_username,
                           u.avatar_url AS sender_avatar_url
                    FROM messages m
                    JOIN users u ON u.id = m.sender_id
                    WHERE m.room_id = $1
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT $2
                    "#,
                )
                .bind(room_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(Message::from).collect())
    }
}

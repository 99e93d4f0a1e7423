//! PostgreSQL implementation of RoomDirectory

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use lunar_core::error::DomainError;
use lunar_core::traits::{RepoResult, RoomDirectory};

use crate::models::RoomModel;

use super::error::{map_db_error, map_foreign_key_violation};

/// PostgreSQL implementation of RoomDirectory
#[derive(Clone)]
pub struct PgRoomDirectory {
    pool: PgPool,
}

impl PgRoomDirectory {
    /// Create a new PgRoomDirectory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a room
    #[instrument(skip(self))]
    pub async fn create(&self, id: Uuid, slug: &str, name: &str) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO rooms (id, slug, name)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(id)
        .bind(slug)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    /// Find a room by id
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<RoomModel>> {
        sqlx::query_as::<_, RoomModel>(
            r"
            SELECT id, slug, name, created_at
            FROM rooms
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

#[async_trait]
impl RoomDirectory for PgRoomDirectory {
    #[instrument(skip(self))]
    async fn exists(&self, room_id: Uuid) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rooms WHERE id = $1)")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn resolve_slug(&self, slug: &str) -> RepoResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM rooms WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn is_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2
            )
            ",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO room_members (room_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (room_id, user_id) DO NOTHING
            ",
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_foreign_key_violation(e, |constraint| match constraint {
                Some("room_members_user_id_fkey") => DomainError::UserNotFound(user_id),
                _ => DomainError::RoomNotFound(room_id.to_string()),
            })
        })?;

        Ok(())
    }
}

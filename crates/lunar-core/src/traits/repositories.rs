//! Collaborator traits (ports) - what the transport needs from the rest of the backend
//!
//! The gateway and bridge depend only on these traits. Postgres
//! implementations live in `lunar-db`; in-memory ones live in
//! [`crate::testing`] behind the `test-util` feature.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Message, User};
use crate::error::DomainError;
use crate::value_objects::{MessageCursor, RoomRef};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Directory
// ============================================================================

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;

    /// Find user by ID, failing with `UserNotFound` when absent
    async fn get(&self, id: Uuid) -> RepoResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }
}

// ============================================================================
// Room Directory
// ============================================================================

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Check whether a room exists
    async fn exists(&self, room_id: Uuid) -> RepoResult<bool>;

    /// Resolve a public slug to a room id
    async fn resolve_slug(&self, slug: &str) -> RepoResult<Option<Uuid>>;

    /// Check room membership
    async fn is_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<bool>;

    /// Add a member. Adding an existing member is a no-op.
    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<()>;

    /// Resolve a URL reference to an existing room id
    async fn resolve(&self, room: &RoomRef) -> RepoResult<Uuid> {
        let id = match room {
            RoomRef::Id(id) => self.exists(*id).await?.then_some(*id),
            RoomRef::Slug(slug) => self.resolve_slug(slug).await?,
        };
        id.ok_or_else(|| DomainError::RoomNotFound(room.to_string()))
    }
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// List a room's messages newest first, strictly older than `cursor`
    async fn list_paged(
        &self,
        room_id: Uuid,
        limit: u32,
        cursor: Option<&MessageCursor>,
    ) -> RepoResult<Vec<Message>>;
}

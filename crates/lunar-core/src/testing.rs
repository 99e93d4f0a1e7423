//! In-memory collaborators for tests
//!
//! Enabled with the `test-util` feature. Each type is cheap to construct
//! and safe to share behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::entities::{Message, User};
use crate::error::DomainError;
use crate::traits::{MessageRepository, RepoResult, RoomDirectory, UserDirectory};
use crate::value_objects::MessageCursor;

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.write().insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }
}

// ============================================================================
// Rooms
// ============================================================================

#[derive(Default)]
pub struct InMemoryRoomDirectory {
    rooms: RwLock<HashMap<Uuid, String>>,
    members: RwLock<HashSet<(Uuid, Uuid)>>,
    fail_membership_writes: AtomicBool,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_room(&self, room_id: Uuid, slug: impl Into<String>) {
        self.rooms.write().insert(room_id, slug.into());
    }

    /// Make every subsequent `add_member` fail with a database error
    pub fn fail_membership_writes(&self, fail: bool) {
        self.fail_membership_writes.store(fail, Ordering::SeqCst);
    }

    pub fn member_count(&self, room_id: Uuid) -> usize {
        self.members
            .read()
            .iter()
            .filter(|(room, _)| *room == room_id)
            .count()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn exists(&self, room_id: Uuid) -> RepoResult<bool> {
        Ok(self.rooms.read().contains_key(&room_id))
    }

    async fn resolve_slug(&self, slug: &str) -> RepoResult<Option<Uuid>> {
        Ok(self
            .rooms
            .read()
            .iter()
            .find(|(_, s)| s.as_str() == slug)
            .map(|(id, _)| *id))
    }

    async fn is_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        Ok(self.members.read().contains(&(room_id, user_id)))
    }

    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> RepoResult<()> {
        if !self.rooms.read().contains_key(&room_id) {
            return Err(DomainError::RoomNotFound(room_id.to_string()));
        }
        if self.fail_membership_writes.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("membership write rejected".to_string()));
        }
        self.members.write().insert((room_id, user_id));
        Ok(())
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
    fail_writes: AtomicBool,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create` fail with a database error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("write rejected".to_string()));
        }
        self.messages.write().push(message.clone());
        Ok(())
    }

    async fn list_paged(
        &self,
        room_id: Uuid,
        limit: u32,
        cursor: Option<&MessageCursor>,
    ) -> RepoResult<Vec<Message>> {
        let mut page: Vec<Message> = self
            .messages
            .read()
            .iter()
            .filter(|m| m.room_id == room_id)
            .filter(|m| cursor.map_or(true, |c| c.is_before(m)))
            .cloned()
            .collect();
        page.sort_by_key(|m| std::cmp::Reverse(m.sort_key()));
        page.truncate(limit as usize);
        Ok(page)
    }
}

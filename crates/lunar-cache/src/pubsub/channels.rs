//! Pub/Sub channel definitions.
//!
//! Defines the topic naming conventions shared by every gateway process.

use uuid::Uuid;

/// Channel prefix for room events
pub const ROOM_CHANNEL_PREFIX: &str = "room:";
/// Channel prefix for user-specific events
pub const USER_CHANNEL_PREFIX: &str = "user:";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Events for everyone currently joined to a room
    Room(Uuid),
    /// Events for a specific user (all their connections)
    User(Uuid),
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    /// Create a room channel
    #[must_use]
    pub fn room(room_id: Uuid) -> Self {
        Self::Room(room_id)
    }

    /// Create a user channel
    #[must_use]
    pub fn user(user_id: Uuid) -> Self {
        Self::User(user_id)
    }

    /// Create a custom channel
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Room(id) => format!("{ROOM_CHANNEL_PREFIX}{id}"),
            Self::User(id) => format!("{USER_CHANNEL_PREFIX}{id}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if let Some(id) = name
            .strip_prefix(ROOM_CHANNEL_PREFIX)
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            return Self::Room(id);
        }

        if let Some(id) = name
            .strip_prefix(USER_CHANNEL_PREFIX)
            .and_then(|s| Uuid::parse_str(s).ok())
        {
            return Self::User(id);
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

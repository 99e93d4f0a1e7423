//! # lunar-core
//!
//! Domain layer for the messaging transport: the durable `Message` entity,
//! time-ordered identifiers, pagination cursors, and the traits describing
//! the collaborators the gateway consumes (user directory, room directory,
//! message store). This crate has no infrastructure dependencies.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use entities::{validate_content, Message, MessageSender, User, MAX_CONTENT_LENGTH};
pub use error::DomainError;
pub use traits::{MessageRepository, RepoResult, RoomDirectory, UserDirectory};
pub use value_objects::{
    normalize_limit, MessageCursor, MessageIdGenerator, MessagePage, MessageStamp, RoomRef,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ROOM_SLUG_LENGTH,
};

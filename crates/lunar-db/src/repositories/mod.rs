//! Repository implementations
//!
//! PostgreSQL implementations of the collaborator traits defined in lunar-core.

mod error;
mod message;
mod room;
mod user;

pub use message::PgMessageRepository;
pub use room::PgRoomDirectory;
pub use user::PgUserDirectory;

//! Database models - SQLx-compatible structs for PostgreSQL rows

mod message;
mod room;
mod user;

pub use message::MessageRow;
pub use room::RoomModel;
pub use user::UserModel;

//! Domain entities - core business objects

mod message;
mod user;

pub use message::{validate_content, Message, MessageSender, MAX_CONTENT_LENGTH};
pub use user::User;

//! Value objects - immutable types that represent domain concepts

mod cursor;
mod message_id;
mod pagination;
mod room_ref;

pub use cursor::MessageCursor;
pub use message_id::{MessageIdGenerator, MessageStamp};
pub use pagination::{normalize_limit, MessagePage, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use room_ref::{RoomRef, ROOM_SLUG_LENGTH};

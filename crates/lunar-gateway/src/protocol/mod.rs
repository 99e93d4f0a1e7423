//! Wire protocol
//!
//! Every frame in either direction is a JSON envelope
//! `{"type": "<kind>", "payload": {...}}`.

mod close_codes;
mod envelope;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::{Envelope, MessageKind};
pub use payloads::{
    ChatMessagePayload, ErrorPayload, IncomingCallPayload, JoinRoomPayload, LeaveRoomPayload,
};

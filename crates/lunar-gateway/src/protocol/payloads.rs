//! Kind-specific payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `join_room`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomPayload {
    /// Room UUID or slug
    pub room_id: String,
}

/// `leave_room`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRoomPayload {
    pub room_id: String,
}

/// `chat_message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    pub room_id: String,
    pub content: String,
}

/// `incoming_call`, published on the callee's user channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCallPayload {
    pub caller_id: Uuid,
    pub caller_name: String,
    pub room_name: String,
}

/// `error`, sent only to the connection whose frame was rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

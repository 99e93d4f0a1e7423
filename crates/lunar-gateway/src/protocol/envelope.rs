//! Envelope format shared by client and server frames

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ErrorPayload;

/// Envelope kinds
///
/// Unrecognised kinds deserialize to [`MessageKind::Unknown`] so a single
/// bad frame never fails the whole decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Client asks to receive a room's traffic
    JoinRoom,
    /// Client stops receiving a room's traffic
    LeaveRoom,
    /// Client sends a chat message
    ChatMessage,
    /// Server delivers a persisted message
    NewMessage,
    /// Server delivers a call invitation on the user channel
    IncomingCall,
    /// Server reports a rejected client frame to its sender
    Error,
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    /// Kinds a client may send
    #[must_use]
    pub const fn is_client_kind(self) -> bool {
        matches!(self, Self::JoinRoom | Self::LeaveRoom | Self::ChatMessage)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::ChatMessage => "chat_message",
            Self::NewMessage => "new_message",
            Self::IncomingCall => "incoming_call",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,

    #[serde(default)]
    pub payload: Value,
}

/// Borrowed form used when encoding, so payloads skip the `Value` detour
#[derive(Serialize)]
struct EnvelopeRef<'a, T: ?Sized> {
    #[serde(rename = "type")]
    kind: MessageKind,
    payload: &'a T,
}

impl Envelope {
    /// Encode a payload straight to JSON text
    pub fn encode<T>(kind: MessageKind, payload: &T) -> Result<String, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_string(&EnvelopeRef { kind, payload })
    }

    /// Encode an `error` frame
    pub fn error(code: &str, message: impl Into<String>) -> Result<String, serde_json::Error> {
        Self::encode(MessageKind::Error, &ErrorPayload::new(code, message))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode the payload into a kind-specific type
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

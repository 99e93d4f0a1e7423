//! State shared by a connection's two loops, and the handlers for client frames

use std::sync::Arc;

use lunar_cache::SubscriptionControl;
use lunar_core::{MessageSender, RoomDirectory, RoomRef};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bridge::MessageBridge;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    ChatMessagePayload, Envelope, JoinRoomPayload, LeaveRoomPayload, MessageKind,
};
use crate::relay::Relay;

pub(crate) struct ConnectionContext {
    pub(crate) id: Uuid,
    pub(crate) sender: MessageSender,
    pub(crate) relay: Relay,
    pub(crate) bridge: Arc<MessageBridge>,
    pub(crate) rooms: Arc<dyn RoomDirectory>,
    pub(crate) control: SubscriptionControl,
    /// Frames for this socket only; drained by the outbound loop
    pub(crate) replies: mpsc::Sender<String>,
}

impl ConnectionContext {
    pub(crate) fn user_id(&self) -> Uuid {
        self.sender.id
    }

    /// Handle one text frame. Never fails the connection: rejected frames
    /// are answered with an `error` envelope.
    pub(crate) async fn handle_text(&self, text: &str) {
        if let Err(e) = self.dispatch(text).await {
            if e.is_client_error() {
                tracing::debug!(
                    connection_id = %self.id,
                    user_id = %self.user_id(),
                    code = e.error_code(),
                    error = %e,
                    "Rejected client frame"
                );
            } else {
                tracing::error!(
                    connection_id = %self.id,
                    user_id = %self.user_id(),
                    code = e.error_code(),
                    error = %e,
                    "Failed to handle client frame"
                );
            }
            self.reply_error(&e);
        }
    }

    async fn dispatch(&self, text: &str) -> GatewayResult<()> {
        let envelope = Envelope::from_json(text).map_err(GatewayError::Decode)?;

        match envelope.kind {
            MessageKind::JoinRoom => {
                let payload: JoinRoomPayload = envelope.payload_as().map_err(GatewayError::Decode)?;
                self.join_room(&payload.room_id).await
            }
            MessageKind::LeaveRoom => {
                let payload: LeaveRoomPayload = envelope.payload_as().map_err(GatewayError::Decode)?;
                self.leave_room(&payload.room_id).await
            }
            MessageKind::ChatMessage => {
                let payload: ChatMessagePayload =
                    envelope.payload_as().map_err(GatewayError::Decode)?;
                self.chat_message(&payload.room_id, payload.content).await
            }
            kind => {
                tracing::warn!(
                    connection_id = %self.id,
                    kind = %kind,
                    "Ignoring unsupported message kind"
                );
                Ok(())
            }
        }
    }

    /// Resolve a room the user already belongs to
    async fn member_room(&self, raw: &str) -> GatewayResult<Uuid> {
        let room_ref: RoomRef = raw.parse()?;
        let room_id = self.rooms.resolve(&room_ref).await?;
        if !self.rooms.is_member(room_id, self.user_id()).await? {
            return Err(lunar_core::DomainError::NotRoomMember { room_id }.into());
        }
        Ok(room_id)
    }

    async fn join_room(&self, raw: &str) -> GatewayResult<()> {
        let room_id = self.member_room(raw).await?;
        self.relay.join(&self.control, room_id).await?;

        tracing::info!(connection_id = %self.id, room_id = %room_id, "Joined room");
        Ok(())
    }

    async fn leave_room(&self, raw: &str) -> GatewayResult<()> {
        let room_ref: RoomRef = raw.parse()?;
        let room_id = self.rooms.resolve(&room_ref).await?;
        self.relay.leave(&self.control, room_id).await?;

        tracing::info!(connection_id = %self.id, room_id = %room_id, "Left room");
        Ok(())
    }

    async fn chat_message(&self, raw: &str, content: String) -> GatewayResult<()> {
        let room_id = self.member_room(raw).await?;
        let message = self.bridge.ingest(room_id, &self.sender, content).await?;

        // Persisted; only now may it be published
        self.relay
            .broadcast(room_id, MessageKind::NewMessage, &message)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    message_id = %message.id,
                    room_id = %room_id,
                    error = %e,
                    "Message stored but not broadcast"
                );
            })
    }

    fn reply_error(&self, err: &GatewayError) {
        let frame = match Envelope::error(err.error_code(), err.to_string()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode error frame");
                return;
            }
        };
        if self.replies.try_send(frame).is_err() {
            tracing::warn!(connection_id = %self.id, "Reply queue full, dropping error frame");
        }
    }
}

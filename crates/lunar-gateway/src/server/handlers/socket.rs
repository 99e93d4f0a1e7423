//! WebSocket upgrade
//!
//! Everything that can be rejected is checked before the upgrade, so a
//! failed handshake is a plain HTTP error. Membership is only granted once
//! the socket exists.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::Response,
};
use futures_util::StreamExt;
use lunar_common::AppError;
use lunar_core::{DomainError, RoomRef};

use crate::error::GatewayError;
use crate::protocol::CloseCode;
use crate::server::{AuthUser, GatewayState};

/// GET /rooms/:room/ws
///
/// `:room` is a room UUID or slug. Connecting makes the user a member,
/// so the URL doubles as an invite.
pub async fn room_socket(
    State(state): State<GatewayState>,
    AuthUser(user_id): AuthUser,
    Path(room): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.cors().allows(origin) {
        tracing::warn!(user_id = %user_id, origin = ?origin, "Rejected WebSocket origin");
        return Err(GatewayError::OriginRejected);
    }

    let room_ref: RoomRef = room.parse()?;
    let room_id = state.rooms().resolve(&room_ref).await?;

    // A valid token for a deleted account is still unauthenticated
    let user = state.users().get(user_id).await.map_err(|e| match e {
        DomainError::UserNotFound(_) => GatewayError::Unauthenticated(AppError::InvalidToken),
        e => e.into(),
    })?;

    let gateway = state.gateway().clone();
    let rooms = state.rooms().clone();
    let max_bytes = gateway.settings().max_message_bytes;

    Ok(ws
        .max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |mut socket| async move {
            if let Err(e) = rooms.add_member(room_id, user.id).await {
                tracing::error!(
                    user_id = %user.id,
                    room_id = %room_id,
                    error = %e,
                    "Failed to record room membership"
                );
                close_with(&mut socket, CloseCode::InternalError).await;
                return;
            }

            let (sink, stream) = socket.split();
            // The outcome is logged by the gateway
            let _ = gateway.open_connection(sink, stream, &user, room_id).await;
        }))
}

async fn close_with(socket: &mut WebSocket, code: CloseCode) {
    let frame = CloseFrame {
        code: code.as_u16(),
        reason: code.description().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

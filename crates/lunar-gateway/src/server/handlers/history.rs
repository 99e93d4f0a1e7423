//! Room history

use axum::{
    extract::{Path, Query, State},
    Json,
};
use lunar_core::{DomainError, MessagePage, RoomRef};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::server::{AuthUser, GatewayState};

/// Raw paging parameters; both are normalised by the bridge
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

/// GET /rooms/:room/messages?limit=&cursor=
pub async fn room_history(
    State(state): State<GatewayState>,
    AuthUser(user_id): AuthUser,
    Path(room): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessagePage>, GatewayError> {
    let room_ref: RoomRef = room.parse()?;
    let room_id = state.rooms().resolve(&room_ref).await?;
    if !state.rooms().is_member(room_id, user_id).await? {
        return Err(DomainError::NotRoomMember { room_id }.into());
    }

    let page = state
        .gateway()
        .bridge()
        .history(room_id, query.limit.as_deref(), query.cursor.as_deref())
        .await?;
    Ok(Json(page))
}

//! Refresh-token endpoints
//!
//! Refresh always rotates: the presented token is consumed and a new one
//! is minted, so a replayed token fails.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::server::{AuthUser, GatewayState, SessionEndpoints};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RevokedSessions {
    pub revoked: u32,
}

fn sessions(state: &GatewayState) -> Result<&SessionEndpoints, GatewayError> {
    state.sessions().ok_or(GatewayError::SessionsDisabled)
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<GatewayState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, GatewayError> {
    let sessions = sessions(&state)?;
    let (user_id, refresh_token) = sessions.store.rotate(&request.refresh_token).await?;
    let access_token = sessions.jwt.issue_access_token(user_id)?;

    tracing::info!(user_id = %user_id, "Rotated refresh token");
    Ok(Json(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: sessions.jwt.access_token_ttl(),
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<GatewayState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<RefreshRequest>,
) -> Result<StatusCode, GatewayError> {
    sessions(&state)?.store.revoke(&request.refresh_token).await?;

    tracing::info!(user_id = %user_id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout-all
pub async fn logout_all(
    State(state): State<GatewayState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RevokedSessions>, GatewayError> {
    let revoked = sessions(&state)?.store.revoke_all(user_id).await?;
    Ok(Json(RevokedSessions { revoked }))
}

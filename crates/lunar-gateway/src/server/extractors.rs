//! Authentication extractor
//!
//! Browsers cannot set headers on a WebSocket handshake, so the access
//! token may arrive as `?token=`; an `Authorization: Bearer` header is
//! accepted as well.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use lunar_common::AppError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authenticated user id
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    GatewayState: FromRef<S>,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let from_query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty());

        let token = match from_query {
            Some(token) => token,
            None => {
                let TypedHeader(Authorization(bearer)) =
                    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                        .await
                        .map_err(|_| GatewayError::Unauthenticated(AppError::MissingAuth))?;
                bearer.token().to_string()
            }
        };

        let app_state = GatewayState::from_ref(state);
        let user_id = app_state.authenticator().authenticate(&token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected access token");
            GatewayError::from(e)
        })?;

        Ok(AuthUser(user_id))
    }
}

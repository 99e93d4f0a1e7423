//! Gateway state
//!
//! Shared handles for the HTTP handlers.

use std::sync::Arc;

use lunar_cache::RefreshTokenStore;
use lunar_common::{Authenticator, CorsConfig, JwtService};
use lunar_core::{RoomDirectory, UserDirectory};

use crate::connection::Gateway;

/// Refresh-token endpoints: the store plus the signer for new access tokens
#[derive(Clone)]
pub struct SessionEndpoints {
    pub store: RefreshTokenStore,
    pub jwt: Arc<JwtService>,
}

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    gateway: Arc<Gateway>,
    authenticator: Arc<dyn Authenticator>,
    users: Arc<dyn UserDirectory>,
    rooms: Arc<dyn RoomDirectory>,
    cors: Arc<CorsConfig>,
    sessions: Option<SessionEndpoints>,
}

impl GatewayState {
    pub fn new(
        gateway: Arc<Gateway>,
        authenticator: Arc<dyn Authenticator>,
        users: Arc<dyn UserDirectory>,
        rooms: Arc<dyn RoomDirectory>,
        cors: CorsConfig,
    ) -> Self {
        Self {
            gateway,
            authenticator,
            users,
            rooms,
            cors: Arc::new(cors),
            sessions: None,
        }
    }

    /// Enable the `/auth/*` refresh-token endpoints
    #[must_use]
    pub fn with_sessions(mut self, sessions: SessionEndpoints) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    pub fn rooms(&self) -> &Arc<dyn RoomDirectory> {
        &self.rooms
    }

    pub fn cors(&self) -> &CorsConfig {
        &self.cors
    }

    pub fn sessions(&self) -> Option<&SessionEndpoints> {
        self.sessions.as_ref()
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("active_connections", &self.gateway.active_connections())
            .field("cors", &self.cors)
            .field("sessions", &self.sessions.is_some())
            .finish()
    }
}

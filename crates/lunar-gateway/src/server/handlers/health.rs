//! Health endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::GatewayError;
use crate::server::GatewayState;

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub connections: usize,
}

/// GET /health/ready - fails with 503 when the bus is unreachable
pub async fn readiness(State(state): State<GatewayState>) -> Result<Json<Readiness>, GatewayError> {
    state.gateway().relay().health_check().await?;
    Ok(Json(Readiness {
        status: "ready",
        connections: state.gateway().active_connections(),
    }))
}

//! Gateway server setup
//!
//! Builds the router, wires the Postgres and Redis collaborators, and runs
//! the listener until a shutdown signal arrives.

mod extractors;
pub mod handlers;
mod state;

pub use extractors::AuthUser;
pub use state::{GatewayState, SessionEndpoints};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use lunar_cache::{RedisBus, RedisPool, RefreshTokenStore};
use lunar_common::{AppConfig, AppError, JwtService};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::bridge::MessageBridge;
use crate::connection::Gateway;
use crate::relay::Relay;

/// How long `run` waits for open sockets to finish their close handshake
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/rooms/:room/ws", get(handlers::room_socket))
        .route("/rooms/:room/messages", get(handlers::room_history))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/logout-all", post(handlers::logout_all))
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// Every connection scope is a child of `shutdown`.
pub async fn create_gateway_state(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let pool = lunar_db::create_pool(&lunar_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    lunar_db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    tracing::info!("Connecting to Redis...");
    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    let bus = RedisBus::new(redis_pool.clone())
        .map_err(|e| AppError::Cache(e.to_string()))?
        .with_buffer(config.websocket.subscription_buffer);
    tracing::info!("Redis connection established");

    let users = Arc::new(lunar_db::PgUserDirectory::new(pool.clone()));
    let rooms = Arc::new(lunar_db::PgRoomDirectory::new(pool.clone()));
    let messages = Arc::new(lunar_db::PgMessageRepository::new(pool));

    let jwt = Arc::new(JwtService::from_config(&config.jwt));
    let bridge = Arc::new(MessageBridge::new(messages, config.messages.clone()));
    let gateway = Arc::new(Gateway::new(
        Relay::new(Arc::new(bus)),
        bridge,
        rooms.clone(),
        config.websocket.clone(),
        shutdown,
    ));

    let sessions = SessionEndpoints {
        store: RefreshTokenStore::from_config(redis_pool, &config.session),
        jwt: jwt.clone(),
    };

    Ok(GatewayState::new(gateway, jwt, users, rooms, config.cors.clone()).with_sessions(sessions))
}

/// Serve `app` on `listener` until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let shutdown = CancellationToken::new();
    let state = create_gateway_state(&config, shutdown.clone()).await?;
    let gateway = state.gateway().clone();

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Gateway listening on ws://{}/rooms/:room/ws", addr);

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    serve(listener, create_app(state), shutdown).await?;

    // Upgraded sockets are not tracked by the listener
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while gateway.active_connections() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            remaining = gateway.active_connections(),
            "Connections still open after shutdown grace period"
        );
    }

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

//! # lunar-common
//!
//! Shared utilities including configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{Authenticator, Claims, JwtService};
pub use config::{
    AppConfig, AppSettings, ConfigError, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    MessagesConfig, RedisConfig, ServerConfig, SessionConfig, WebSocketConfig,
};
pub use error::AppError;
pub use telemetry::{try_init_tracing, TracingConfig, TracingError};

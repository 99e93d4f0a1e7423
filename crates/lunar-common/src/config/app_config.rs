//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub cors: CorsConfig,
    pub websocket: WebSocketConfig,
    pub messages: MessagesConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Listener configuration for the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// JWT configuration for access tokens
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: i64,
}

/// Refresh-token session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_user_key_prefix")]
    pub user_key_prefix: String,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// An empty allow-list admits any origin
    #[must_use]
    pub fn allows(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| {
            self.allowed_origins
                .iter()
                .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
        })
    }
}

/// WebSocket connection tuning
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Seconds between protocol pings
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// Capacity of the per-connection direct reply queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Capacity of the per-connection bus delivery queue
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
    /// Largest inbound frame or message accepted; larger ones close the socket
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl WebSocketConfig {
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            outbound_buffer: default_outbound_buffer(),
            subscription_buffer: default_subscription_buffer(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Message content and history paging limits
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            max_content_length: default_max_content_length(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "lunar".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_issuer() -> String {
    "lunar".to_string()
}

fn default_access_token_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_ttl() -> u64 {
    2_592_000 // 720 hours
}

fn default_key_prefix() -> String {
    "refresh:".to_string()
}

fn default_user_key_prefix() -> String {
    "user:".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_outbound_buffer() -> usize {
    32
}

fn default_subscription_buffer() -> usize {
    256
}

/// Room for a full-length message of 4-byte characters plus the envelope
fn default_max_message_bytes() -> usize {
    64 * 1024
}

fn default_max_content_length() -> usize {
    lunar_core::MAX_CONTENT_LENGTH
}

fn default_page_size() -> u32 {
    lunar_core::DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    lunar_core::MAX_PAGE_SIZE
}

/// Read a required variable
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

/// Read an optional variable, parsing it when set
fn parsed_or<T: FromStr>(name: &'static str, default: impl FnOnce() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        _ => Ok(default()),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: parsed_or("APP_ENV", default_env)?,
            },
            gateway: ServerConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                port: parsed_or("GATEWAY_PORT", default_gateway_port)?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", default_max_connections)?,
                min_connections: parsed_or("DATABASE_MIN_CONNECTIONS", default_min_connections)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                max_connections: parsed_or("REDIS_MAX_CONNECTIONS", default_redis_max_connections)?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| default_issuer()),
                access_token_ttl: parsed_or("JWT_ACCESS_TOKEN_TTL", default_access_token_ttl)?,
            },
            session: SessionConfig {
                refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", default_refresh_token_ttl)?,
                key_prefix: env::var("REFRESH_KEY_PREFIX").unwrap_or_else(|_| default_key_prefix()),
                user_key_prefix: env::var("REFRESH_USER_KEY_PREFIX")
                    .unwrap_or_else(|_| default_user_key_prefix()),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            websocket: WebSocketConfig {
                heartbeat_interval_secs: parsed_or("WS_HEARTBEAT_INTERVAL", default_heartbeat_interval)?,
                outbound_buffer: parsed_or("WS_OUTBOUND_BUFFER", default_outbound_buffer)?,
                subscription_buffer: parsed_or("WS_SUBSCRIPTION_BUFFER", default_subscription_buffer)?,
                max_message_bytes: parsed_or("WS_MAX_MESSAGE_BYTES", default_max_message_bytes)?,
            },
            messages: MessagesConfig {
                max_content_length: parsed_or("MESSAGE_MAX_LENGTH", default_max_content_length)?,
                default_page_size: parsed_or("MESSAGE_PAGE_SIZE", default_page_size)?,
                max_page_size: parsed_or("MESSAGE_MAX_PAGE_SIZE", default_max_page_size)?,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

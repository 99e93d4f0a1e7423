//! Refresh token storage in Redis.
//!
//! Tokens are opaque random strings handed to the client once. Only their
//! SHA-256 hash is stored, mapped to the owning user with a TTL. Each user
//! also has a set of live hashes so every session can be revoked at once.
//!
//! Keys:
//! - `{prefix}{hash}` holds the user id
//! - `{prefix}{user_prefix}{user_id}` is the set of the user's hashes

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use redis::{AsyncCommands, Script};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::pool::{RedisPool, RedisPoolError};

/// Default key prefix for refresh tokens
const DEFAULT_KEY_PREFIX: &str = "refresh:";

/// Default prefix for per-user token sets (nested under the key prefix)
const DEFAULT_USER_KEY_PREFIX: &str = "user:";

/// Default TTL for refresh tokens (720 hours)
const DEFAULT_REFRESH_TOKEN_TTL: u64 = 720 * 60 * 60;

/// Random bytes per token
const TOKEN_BYTES: usize = 32;

/// Deletes every hash in the user's set, then the set itself, in one step.
/// Returns how many token keys still existed.
/// KEYS[1] = user set, ARGV[1] = token key prefix.
const REVOKE_ALL_SCRIPT: &str = r"
local hashes = redis.call('SMEMBERS', KEYS[1])
local revoked = 0
for _, hash in ipairs(hashes) do
    revoked = revoked + redis.call('DEL', ARGV[1] .. hash)
end
redis.call('DEL', KEYS[1])
return revoked
";

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown, expired, already consumed, or revoked
    #[error("Invalid refresh token")]
    InvalidToken,

    #[error("Session store error: {0}")]
    Pool(#[from] RedisPoolError),

    #[error("Session store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session entry: {0}")]
    Corrupt(String),
}

impl SessionError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_REFRESH_TOKEN",
            Self::Pool(_) | Self::Redis(_) => "SESSION_STORE_UNAVAILABLE",
            Self::Corrupt(_) => "SESSION_STORE_CORRUPT",
        }
    }

    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken)
    }
}

/// Result type for session store operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Refresh token store for managing authentication sessions
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: RedisPool,
    ttl_seconds: u64,
    key_prefix: String,
    user_key_prefix: String,
    revoke_all: Script,
}

impl RefreshTokenStore {
    /// Create a new refresh token store with default prefixes and TTL
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self::with_settings(
            pool,
            DEFAULT_REFRESH_TOKEN_TTL,
            DEFAULT_KEY_PREFIX,
            DEFAULT_USER_KEY_PREFIX,
        )
    }

    /// Create with explicit TTL and key prefixes
    #[must_use]
    pub fn with_settings(
        pool: RedisPool,
        ttl_seconds: u64,
        key_prefix: impl Into<String>,
        user_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            ttl_seconds,
            key_prefix: key_prefix.into(),
            user_key_prefix: user_key_prefix.into(),
            revoke_all: Script::new(REVOKE_ALL_SCRIPT),
        }
    }

    /// Create from lunar-common session config
    #[must_use]
    pub fn from_config(pool: RedisPool, config: &lunar_common::SessionConfig) -> Self {
        Self::with_settings(
            pool,
            config.refresh_token_ttl,
            config.key_prefix.clone(),
            config.user_key_prefix.clone(),
        )
    }

    /// Redis key holding the owner of a token hash
    fn token_key(&self, hash: &str) -> String {
        format!("{}{hash}", self.key_prefix)
    }

    /// Redis key of the user's hash set
    fn user_key(&self, user_id: Uuid) -> String {
        format!("{}{}{user_id}", self.key_prefix, self.user_key_prefix)
    }

    /// Issue a new token for a user.
    ///
    /// The mapping, the set membership, and the set TTL are written in one
    /// MULTI/EXEC transaction. Returns the plaintext token.
    pub async fn issue(&self, user_id: Uuid) -> SessionResult<String> {
        let token = generate_token();
        let hash = hash_token(&token);
        let user_key = self.user_key(user_id);
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);

        let mut conn = self.pool.get().await?;
        let (): () = redis::pipe()
            .atomic()
            .set_ex(self.token_key(&hash), user_id.to_string(), self.ttl_seconds)
            .ignore()
            .sadd(&user_key, &hash)
            .ignore()
            .expire(&user_key, ttl)
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!(user_id = %user_id, "Issued refresh token");
        Ok(token)
    }

    /// Consume a token, returning its owner. A token can be consumed once.
    ///
    /// The read and delete are a single GETDEL. Removing the hash from the
    /// user's set afterwards is best effort.
    pub async fn consume(&self, token: &str) -> SessionResult<Uuid> {
        let hash = hash_token(token);
        let mut conn = self.pool.get().await?;

        let owner: Option<String> = redis::cmd("GETDEL")
            .arg(self.token_key(&hash))
            .query_async(&mut conn)
            .await?;
        let owner = owner.ok_or(SessionError::InvalidToken)?;
        let user_id = Uuid::parse_str(&owner).map_err(|_| SessionError::Corrupt(owner))?;

        if let Err(e) = conn.srem::<_, _, ()>(self.user_key(user_id), &hash).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to untrack consumed refresh token");
        }

        tracing::debug!(user_id = %user_id, "Consumed refresh token");
        Ok(user_id)
    }

    /// Revoke a token. Unknown or already-used tokens are not an error.
    pub async fn revoke(&self, token: &str) -> SessionResult<()> {
        match self.consume(token).await {
            Ok(_) | Err(SessionError::InvalidToken) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Revoke every token a user holds (logout from all devices).
    ///
    /// Atomic with respect to tokens issued before the call; a token issued
    /// concurrently may survive.
    pub async fn revoke_all(&self, user_id: Uuid) -> SessionResult<u32> {
        let mut conn = self.pool.get().await?;
        let revoked: u32 = self
            .revoke_all
            .key(self.user_key(user_id))
            .arg(&self.key_prefix)
            .invoke_async(&mut conn)
            .await?;

        tracing::info!(
            user_id = %user_id,
            count = revoked,
            "Revoked all refresh tokens for user"
        );

        Ok(revoked)
    }

    /// Exchange a token for a fresh one. The presented token is consumed
    /// first, so a replayed token fails with `InvalidToken`.
    pub async fn rotate(&self, token: &str) -> SessionResult<(Uuid, String)> {
        let user_id = self.consume(token).await?;
        let next = self.issue(user_id).await?;
        Ok((user_id, next))
    }
}

/// 32 random bytes, URL-safe base64
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Lowercase hex SHA-256 of the token
fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

//! # lunar-cache
//!
//! Redis layer for the messaging transport.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Pub/Sub Bus**: Topic fan-out across gateway processes, with per-connection
//!   subscriptions whose topic set can change while they are live
//! - **Session Storage**: Single-use, rotating refresh tokens
//!
//! ## Example
//!
//! ```ignore
//! use lunar_cache::{Bus, PubSubChannel, RedisBus, RedisPool, RedisPoolConfig};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let bus = RedisBus::new(pool)?;
//!
//! let mut subscription = bus
//!     .subscribe(&[PubSubChannel::user(user_id)], shutdown.child_token())
//!     .await?;
//! subscription.control().join(PubSubChannel::room(room_id)).await?;
//!
//! bus.publish(&PubSubChannel::room(room_id), r#"{"type":"new_message"}"#).await?;
//! let delivered = subscription.recv().await;
//! ```

pub mod pool;
pub mod pubsub;
pub mod session;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export pubsub types
pub use pubsub::{
    Bus, BusError, BusMessage, BusResult, MemoryBus, PubSubChannel, RedisBus, Subscription,
    SubscriptionControl, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX,
};

// Re-export session types
pub use session::{RefreshTokenStore, SessionError, SessionResult};

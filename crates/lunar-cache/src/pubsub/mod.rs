//! Pub/Sub module.
//!
//! Provides publish/subscribe fan-out for real-time event distribution.

mod bus;
mod channels;
mod memory;
mod redis_bus;

pub use bus::{Bus, BusError, BusMessage, BusResult, Subscription, SubscriptionControl};
pub use channels::{PubSubChannel, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
pub use memory::MemoryBus;
pub use redis_bus::RedisBus;

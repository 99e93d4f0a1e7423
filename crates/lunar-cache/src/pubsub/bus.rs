//! Bus abstraction shared by the Redis and in-process implementations.
//!
//! A [`Subscription`] belongs to exactly one connection. Its topic set is
//! changed by sending commands to a driver task, so joins and leaves never
//! race with the consumer draining messages.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::pool::RedisPoolError;
use crate::pubsub::PubSubChannel;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Pool error: {0}")]
    Pool(#[from] RedisPoolError),

    #[error("Subscription closed")]
    Closed,
}

impl BusError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redis(_) | Self::Pool(_) => "BUS_UNAVAILABLE",
            Self::Closed => "SUBSCRIPTION_CLOSED",
        }
    }
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Message delivered to a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Channel the message was published on
    pub channel: PubSubChannel,
    /// Raw payload, forwarded verbatim
    pub payload: String,
}

impl BusMessage {
    pub(crate) fn new(channel_name: &str, payload: String) -> Self {
        Self {
            channel: PubSubChannel::parse(channel_name),
            payload,
        }
    }
}

/// Topic-based publish/subscribe
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish a payload. Delivery is at-most-once with no replay.
    async fn publish(&self, channel: &PubSubChannel, payload: &str) -> BusResult<()>;

    /// Open a subscription to `channels`.
    ///
    /// The subscription ends when `cancel` fires, when it is dropped, or
    /// when [`SubscriptionControl::close`] is called.
    async fn subscribe(
        &self,
        channels: &[PubSubChannel],
        cancel: CancellationToken,
    ) -> BusResult<Subscription>;

    /// Check that the bus backend is reachable
    async fn health_check(&self) -> BusResult<()>;
}

/// Commands sent to a subscription driver
#[derive(Debug)]
pub(crate) enum SubscriptionCommand {
    Join(String, oneshot::Sender<BusResult<()>>),
    Leave(String, oneshot::Sender<BusResult<()>>),
}

/// Cloneable handle for changing a live subscription's topics
#[derive(Debug, Clone)]
pub struct SubscriptionControl {
    commands: mpsc::Sender<SubscriptionCommand>,
    cancel: CancellationToken,
}

impl SubscriptionControl {
    /// Add a topic. Returns once the backend has acknowledged it.
    pub async fn join(&self, channel: PubSubChannel) -> BusResult<()> {
        self.send(|reply| SubscriptionCommand::Join(channel.name(), reply))
            .await
    }

    /// Remove a topic. Other topics and the connection are unaffected.
    pub async fn leave(&self, channel: PubSubChannel) -> BusResult<()> {
        self.send(|reply| SubscriptionCommand::Leave(channel.name(), reply))
            .await
    }

    /// Stop the driver and release the backend connection
    pub fn close(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send(
        &self,
        command: impl FnOnce(oneshot::Sender<BusResult<()>>) -> SubscriptionCommand,
    ) -> BusResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| BusError::Closed)?;
        reply_rx.await.map_err(|_| BusError::Closed)?
    }
}

/// A live subscription: a message stream plus its control handle
#[derive(Debug)]
pub struct Subscription {
    control: SubscriptionControl,
    messages: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    /// Create the channels a driver task needs.
    ///
    /// Returns the subscription, the driver's command receiver, and the
    /// sender the driver delivers messages through.
    pub(crate) fn channel(
        cancel: CancellationToken,
        buffer: usize,
    ) -> (
        Self,
        mpsc::Receiver<SubscriptionCommand>,
        mpsc::Sender<BusMessage>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (message_tx, message_rx) = mpsc::channel(buffer.max(1));
        let subscription = Self {
            control: SubscriptionControl {
                commands: command_tx,
                cancel,
            },
            messages: message_rx,
        };
        (subscription, command_rx, message_tx)
    }

    #[must_use]
    pub fn control(&self) -> SubscriptionControl {
        self.control.clone()
    }

    /// Receive the next message. `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.messages.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.control.close();
    }
}

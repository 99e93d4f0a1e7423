//! Redis-backed bus.
//!
//! Publishing goes through the shared pool. Each subscription opens its own
//! pub/sub connection, owned by a driver task that multiplexes incoming
//! messages, join/leave commands, and cancellation.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::PubSub;
use redis::{AsyncCommands, Client};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::bus::{Bus, BusMessage, BusResult, Subscription, SubscriptionCommand};
use crate::pool::{redact, RedisPool};
use crate::pubsub::PubSubChannel;

/// Default per-subscription delivery buffer
const DEFAULT_SUBSCRIPTION_BUFFER: usize = 256;

/// Redis Pub/Sub bus
#[derive(Clone)]
pub struct RedisBus {
    pool: RedisPool,
    client: Client,
    buffer: usize,
}

impl RedisBus {
    /// Create a bus publishing through `pool` and subscribing via dedicated connections
    pub fn new(pool: RedisPool) -> BusResult<Self> {
        let client = Client::open(pool.url())?;
        Ok(Self {
            pool,
            client,
            buffer: DEFAULT_SUBSCRIPTION_BUFFER,
        })
    }

    /// Set the per-subscription delivery buffer
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Driver loop: runs until cancelled, the consumer goes away, or the
    /// Redis stream ends.
    async fn drive(
        mut pubsub: PubSub,
        mut commands: mpsc::Receiver<SubscriptionCommand>,
        messages: mpsc::Sender<BusMessage>,
        cancel: CancellationToken,
    ) {
        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                // Handle topic changes
                cmd = commands.recv() => {
                    match cmd {
                        Some(SubscriptionCommand::Join(channel, reply)) => {
                            // Need to drop stream to access pubsub
                            drop(stream);
                            let result: BusResult<()> =
                                pubsub.subscribe(&channel).await.map_err(Into::into);
                            if result.is_ok() {
                                tracing::debug!(channel = %channel, "Subscribed to channel");
                            }
                            let _ = reply.send(result);
                            stream = pubsub.on_message();
                        }
                        Some(SubscriptionCommand::Leave(channel, reply)) => {
                            drop(stream);
                            let result: BusResult<()> =
                                pubsub.unsubscribe(&channel).await.map_err(Into::into);
                            if result.is_ok() {
                                tracing::debug!(channel = %channel, "Unsubscribed from channel");
                            }
                            let _ = reply.send(result);
                            stream = pubsub.on_message();
                        }
                        None => break,
                    }
                }

                // Handle incoming messages
                msg = stream.next() => {
                    match msg {
                        Some(msg) => {
                            let payload: String = match msg.get_payload() {
                                Ok(payload) => payload,
                                Err(e) => {
                                    tracing::warn!(error = %e, "Dropping non-text Pub/Sub payload");
                                    continue;
                                }
                            };
                            let message = BusMessage::new(msg.get_channel_name(), payload);
                            if messages.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::warn!("Pub/Sub stream ended");
                            break;
                        }
                    }
                }
            }
        }

        tracing::trace!("Subscription driver stopped");
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &PubSubChannel, payload: &str) -> BusResult<()> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();

        let receivers: u32 = conn.publish(&channel_name, payload).await?;

        tracing::debug!(
            channel = %channel_name,
            receivers = receivers,
            "Published message"
        );

        Ok(())
    }

    async fn subscribe(
        &self,
        channels: &[PubSubChannel],
        cancel: CancellationToken,
    ) -> BusResult<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(channel.name()).await?;
        }

        tracing::debug!(
            url = %redact(self.pool.url()),
            channels = channels.len(),
            "Subscription connected to Redis"
        );

        let driver_cancel = cancel.child_token();
        let (subscription, commands, messages) =
            Subscription::channel(driver_cancel.clone(), self.buffer);
        tokio::spawn(Self::drive(pubsub, commands, messages, driver_cancel));

        Ok(subscription)
    }

    async fn health_check(&self) -> BusResult<()> {
        self.pool.health_check().await?;
        Ok(())
    }
}

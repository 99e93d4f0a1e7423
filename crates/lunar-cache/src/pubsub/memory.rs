//! In-process bus.
//!
//! One `broadcast` channel per topic. Each subscription runs a forwarder
//! task per joined topic that copies payloads into the subscription's
//! delivery queue. Used for single-process deployments and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::bus::{Bus, BusMessage, BusResult, Subscription, SubscriptionCommand};
use crate::pubsub::PubSubChannel;

/// Capacity of each topic's broadcast channel. Lagging forwarders skip messages.
const TOPIC_CAPACITY: usize = 1024;

/// Default per-subscription delivery buffer
const DEFAULT_SUBSCRIPTION_BUFFER: usize = 256;

/// In-process Pub/Sub bus. Cloneable; clones share topics.
#[derive(Clone)]
pub struct MemoryBus {
    topics: Arc<DashMap<String, broadcast::Sender<String>>>,
    buffer: usize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            buffer: DEFAULT_SUBSCRIPTION_BUFFER,
        }
    }

    /// Set the per-subscription delivery buffer
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Number of live receivers on a topic
    pub fn receiver_count(&self, channel: &PubSubChannel) -> usize {
        self.topics
            .get(&channel.name())
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Start forwarding one topic into a subscription.
    ///
    /// The broadcast receiver is created before this returns, so anything
    /// published afterwards is delivered. The returned token stops the
    /// forwarder; the last forwarder to leave a topic removes it.
    fn forward(
        &self,
        name: String,
        messages: mpsc::Sender<BusMessage>,
        scope: &CancellationToken,
    ) -> CancellationToken {
        let mut rx = self
            .topics
            .entry(name.clone())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe();

        let cancel = scope.child_token();
        let stop = cancel.clone();
        let topics = Arc::clone(&self.topics);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(payload) => {
                            if messages.send(BusMessage::new(&name, payload)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(channel = %name, skipped, "Subscription lagged, messages dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }

            drop(rx);
            // Entry-level locking orders this against a concurrent subscribe
            if topics
                .remove_if(&name, |_, tx| tx.receiver_count() == 0)
                .is_some()
            {
                tracing::debug!(channel = %name, "Removed idle topic");
            }
        });

        stop
    }

    async fn drive(
        self,
        mut forwarders: HashMap<String, CancellationToken>,
        mut commands: mpsc::Receiver<SubscriptionCommand>,
        messages: mpsc::Sender<BusMessage>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                cmd = commands.recv() => match cmd {
                    Some(SubscriptionCommand::Join(channel, reply)) => {
                        if !forwarders.contains_key(&channel) {
                            let stop = self.forward(channel.clone(), messages.clone(), &cancel);
                            forwarders.insert(channel.clone(), stop);
                            tracing::debug!(channel = %channel, "Subscribed to channel");
                        }
                        let _ = reply.send(Ok(()));
                    }
                    Some(SubscriptionCommand::Leave(channel, reply)) => {
                        if let Some(stop) = forwarders.remove(&channel) {
                            stop.cancel();
                            tracing::debug!(channel = %channel, "Unsubscribed from channel");
                        }
                        let _ = reply.send(Ok(()));
                    }
                    None => break,
                },
            }
        }

        for stop in forwarders.into_values() {
            stop.cancel();
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &PubSubChannel, payload: &str) -> BusResult<()> {
        let channel_name = channel.name();
        // No receivers is not an error
        let receivers = self
            .topics
            .get(&channel_name)
            .and_then(|tx| tx.send(payload.to_string()).ok())
            .unwrap_or(0);

        tracing::debug!(channel = %channel_name, receivers, "Published message");
        Ok(())
    }

    async fn subscribe(
        &self,
        channels: &[PubSubChannel],
        cancel: CancellationToken,
    ) -> BusResult<Subscription> {
        let driver_cancel = cancel.child_token();
        let (subscription, commands, messages) =
            Subscription::channel(driver_cancel.clone(), self.buffer);

        let forwarders = channels
            .iter()
            .map(|channel| {
                let name = channel.name();
                let stop = self.forward(name.clone(), messages.clone(), &driver_cancel);
                (name, stop)
            })
            .collect();

        tokio::spawn(self.clone().drive(forwarders, commands, messages, driver_cancel));
        Ok(subscription)
    }

    async fn health_check(&self) -> BusResult<()> {
        Ok(())
    }
}

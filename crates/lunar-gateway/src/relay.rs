//! Subscription / fan-out relay
//!
//! Publishing wraps a payload in an envelope and hands it to the bus on the
//! room or user topic. Every process subscribed to that topic forwards it
//! to its own sockets; there is no registry of connections.

use std::sync::Arc;

use lunar_cache::{Bus, PubSubChannel, Subscription, SubscriptionControl};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{Envelope, IncomingCallPayload, MessageKind};

/// Process-wide handle on the bus. Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    bus: Arc<dyn Bus>,
}

impl Relay {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self { bus }
    }

    /// Publish an event to everyone listening on a room.
    ///
    /// Success means the bus accepted it, not that anyone received it.
    pub async fn broadcast<T>(&self, room_id: Uuid, kind: MessageKind, payload: &T) -> GatewayResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.publish(PubSubChannel::room(room_id), kind, payload).await
    }

    /// Deliver an out-of-band event to a user's connections, whatever rooms
    /// they are in. A no-op when the user is offline.
    pub async fn publish_user_event<T>(
        &self,
        user_id: Uuid,
        kind: MessageKind,
        payload: &T,
    ) -> GatewayResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.publish(PubSubChannel::user(user_id), kind, payload).await
    }

    /// Ring a user
    pub async fn incoming_call(&self, callee_id: Uuid, call: &IncomingCallPayload) -> GatewayResult<()> {
        self.publish_user_event(callee_id, MessageKind::IncomingCall, call)
            .await
    }

    async fn publish<T>(&self, channel: PubSubChannel, kind: MessageKind, payload: &T) -> GatewayResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let frame = Envelope::encode(kind, payload).map_err(GatewayError::Encode)?;
        self.bus.publish(&channel, &frame).await?;

        tracing::debug!(channel = %channel, kind = %kind, "Relayed event");
        Ok(())
    }

    /// Open the subscription owned by one connection: its user channel plus
    /// the room it connected to.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        scope: CancellationToken,
    ) -> GatewayResult<Subscription> {
        let channels = [PubSubChannel::user(user_id), PubSubChannel::room(room_id)];
        Ok(self.bus.subscribe(&channels, scope).await?)
    }

    /// Add a room to a live subscription
    pub async fn join(&self, control: &SubscriptionControl, room_id: Uuid) -> GatewayResult<()> {
        Ok(control.join(PubSubChannel::room(room_id)).await?)
    }

    /// Remove a room from a live subscription
    pub async fn leave(&self, control: &SubscriptionControl, room_id: Uuid) -> GatewayResult<()> {
        Ok(control.leave(PubSubChannel::room(room_id)).await?)
    }

    pub async fn health_check(&self) -> GatewayResult<()> {
        Ok(self.bus.health_check().await?)
    }
}

//! Connection gateway: owns the lifecycle of every accepted socket

use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::{Sink, Stream};
use lunar_common::WebSocketConfig;
use lunar_core::{RoomDirectory, User};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use super::context::ConnectionContext;
use super::outbound::Outbound;
use super::{inbound, Frame};
use crate::bridge::MessageBridge;
use crate::error::{GatewayError, GatewayResult};
use crate::relay::Relay;

/// How long the loops get to notice cancellation before being aborted
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest heartbeat period accepted
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

pub struct Gateway {
    relay: Relay,
    bridge: Arc<MessageBridge>,
    rooms: Arc<dyn RoomDirectory>,
    settings: WebSocketConfig,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl Gateway {
    /// `shutdown` is the parent of every connection scope
    pub fn new(
        relay: Relay,
        bridge: Arc<MessageBridge>,
        rooms: Arc<dyn RoomDirectory>,
        settings: WebSocketConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            relay,
            bridge,
            rooms,
            settings,
            shutdown,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn bridge(&self) -> &Arc<MessageBridge> {
        &self.bridge
    }

    pub fn settings(&self) -> &WebSocketConfig {
        &self.settings
    }

    /// Live connections on this process
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Cancel every live connection
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Serve one upgraded socket until it closes, fails, or the process
    /// shuts down.
    ///
    /// `user` has already been authenticated and `room_id` resolved. The
    /// socket, the subscription and both loops are released on every exit
    /// path. Returns the error that ended the connection, if any.
    #[instrument(skip_all, fields(user_id = %user.id, room_id = %room_id))]
    pub async fn open_connection<W, R, E>(
        &self,
        sink: W,
        stream: R,
        user: &User,
        room_id: Uuid,
    ) -> GatewayResult<()>
    where
        W: Sink<Frame> + Unpin + Send + 'static,
        W::Error: Display + Send,
        R: Stream<Item = Result<Frame, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let connection_id = Uuid::new_v4();
        let scope = self.shutdown.child_token();
        let _scope_guard = scope.clone().drop_guard();
        let _active = ActiveGuard::enter(&self.active);

        let subscription = self.relay.subscribe(user.id, room_id, scope.clone()).await?;
        let (reply_tx, reply_rx) = mpsc::channel(self.settings.outbound_buffer.max(1));

        let ctx = Arc::new(ConnectionContext {
            id: connection_id,
            sender: user.as_sender(),
            relay: self.relay.clone(),
            bridge: self.bridge.clone(),
            rooms: self.rooms.clone(),
            control: subscription.control(),
            replies: reply_tx,
        });
        let outbound = Outbound {
            connection_id,
            subscription,
            replies: reply_rx,
            heartbeat: self.settings.heartbeat_interval().max(MIN_HEARTBEAT),
        };

        tracing::info!(connection_id = %connection_id, "Connection opened");

        let (inbound_tx, inbound_rx) = oneshot::channel();
        let (outbound_tx, outbound_rx) = oneshot::channel();

        let inbound_task = tokio::spawn({
            let scope = scope.clone();
            async move {
                let _ = inbound_tx.send(inbound::run(stream, ctx, scope).await);
            }
        });
        let outbound_task = tokio::spawn({
            let scope = scope.clone();
            async move {
                let _ = outbound_tx.send(outbound.run(sink, scope).await);
            }
        });

        let result = tokio::select! {
            result = inbound_rx => result.unwrap_or(Err(GatewayError::TaskAborted)),
            result = outbound_rx => result.unwrap_or(Err(GatewayError::TaskAborted)),
            () = scope.cancelled() => Ok(()),
        };

        scope.cancel();
        drain(connection_id, [inbound_task, outbound_task]).await;

        match &result {
            Ok(()) => tracing::info!(connection_id = %connection_id, "Connection closed"),
            Err(e) if e.is_transport() => {
                tracing::info!(connection_id = %connection_id, error = %e, "Connection dropped");
            }
            Err(e) => tracing::warn!(connection_id = %connection_id, error = %e, "Connection failed"),
        }

        result
    }
}

/// Wait for both loops to observe cancellation, aborting stragglers
async fn drain(connection_id: Uuid, tasks: [JoinHandle<()>; 2]) {
    let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
    if tokio::time::timeout(DRAIN_TIMEOUT, join_all(tasks)).await.is_err() {
        tracing::warn!(connection_id = %connection_id, "Connection tasks did not stop, aborting");
        for handle in aborts {
            handle.abort();
        }
    }
}

/// Counts a connection as live for as long as it is held
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self(active.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

//! Outbound loop and keepalive
//!
//! Multiplexes bus deliveries, direct replies, the heartbeat timer and
//! cancellation. Writes are strictly sequential; any write failure means
//! the peer is gone.

use std::borrow::Cow;
use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::CloseFrame;
use futures_util::{Sink, SinkExt};
use lunar_cache::{BusError, Subscription};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Frame;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::CloseCode;

pub(crate) struct Outbound {
    pub(crate) connection_id: Uuid,
    pub(crate) subscription: Subscription,
    pub(crate) replies: mpsc::Receiver<String>,
    pub(crate) heartbeat: Duration,
}

impl Outbound {
    pub(crate) async fn run<W>(mut self, mut sink: W, scope: CancellationToken) -> GatewayResult<()>
    where
        W: Sink<Frame> + Unpin,
        W::Error: Display,
    {
        // First ping one full period after connect
        let mut heartbeat = interval_at(Instant::now() + self.heartbeat, self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = scope.cancelled() => {
                    let _ = sink.send(closing()).await;
                    let _ = sink.close().await;
                    return Ok(());
                }

                _ = heartbeat.tick() => {
                    sink.send(Frame::Ping(Vec::new()))
                        .await
                        .map_err(GatewayError::transport)?;
                    tracing::trace!(connection_id = %self.connection_id, "Ping sent");
                }

                Some(frame) = self.replies.recv() => {
                    sink.send(Frame::Text(frame))
                        .await
                        .map_err(GatewayError::transport)?;
                }

                delivery = self.subscription.recv() => match delivery {
                    Some(message) => {
                        sink.send(Frame::Text(message.payload))
                            .await
                            .map_err(GatewayError::transport)?;
                    }
                    None => return Err(BusError::Closed.into()),
                },
            }
        }
    }
}

/// Close frame sent when the scope ends from this side
fn closing() -> Frame {
    Frame::Close(Some(CloseFrame {
        code: CloseCode::GoingAway.as_u16(),
        reason: Cow::Borrowed(""),
    }))
}

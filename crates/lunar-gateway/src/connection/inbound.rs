//! Inbound loop: reads client frames until close, error or cancellation

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::context::ConnectionContext;
use super::Frame;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::CloseCode;

pub(crate) async fn run<R, E>(
    mut stream: R,
    ctx: Arc<ConnectionContext>,
    scope: CancellationToken,
) -> GatewayResult<()>
where
    R: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            () = scope.cancelled() => return Ok(()),
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Frame::Text(text))) => ctx.handle_text(&text).await,
            Some(Ok(Frame::Binary(data))) => {
                tracing::warn!(
                    connection_id = %ctx.id,
                    len = data.len(),
                    "Binary frames are not supported, dropping"
                );
            }
            Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {
                // Pongs to our pings, and pings axum already answers
                tracing::trace!(connection_id = %ctx.id, "Control frame received");
            }
            Some(Ok(Frame::Close(close))) => {
                let code = close.map(|frame| frame.code);
                if CloseCode::is_expected(code) {
                    tracing::debug!(connection_id = %ctx.id, code = ?code, "Client closed connection");
                    return Ok(());
                }
                return Err(GatewayError::UnexpectedClose(code));
            }
            Some(Err(e)) => return Err(GatewayError::transport(e)),
            None => return Err(GatewayError::UnexpectedClose(None)),
        }
    }
}

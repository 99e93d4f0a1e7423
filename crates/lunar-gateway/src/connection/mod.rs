//! Per-connection lifecycle
//!
//! Each accepted socket runs an inbound loop (client frames) and an
//! outbound loop (bus deliveries, replies, pings) inside one cancellation
//! scope. The outbound loop is the only writer to the socket.

mod context;
mod gateway;
mod inbound;
mod outbound;

pub use gateway::Gateway;

/// Socket frame type shared by the loops
pub type Frame = axum::extract::ws::Message;

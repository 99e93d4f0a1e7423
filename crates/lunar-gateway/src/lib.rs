//! # lunar-gateway
//!
//! Real-time transport for Lunar rooms.
//!
//! A client opens `/rooms/:room/ws` with an access token. The gateway
//! subscribes the socket to the room's topic and the user's own topic,
//! persists chat messages through the [`MessageBridge`], and fans them out
//! through the [`Relay`] so every gateway process sharing the bus delivers
//! them.

pub mod bridge;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;

pub use bridge::MessageBridge;
pub use connection::{Frame, Gateway};
pub use error::{GatewayError, GatewayResult};
pub use relay::Relay;
pub use server::{create_app, create_gateway_state, create_router, run, serve, GatewayState};

//! Integration test utilities for the Lunar gateway
//!
//! Spins up real gateway listeners on ephemeral ports and drives them
//! over HTTP and WebSocket.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;

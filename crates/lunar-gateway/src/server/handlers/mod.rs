//! HTTP handlers

mod health;
mod history;
mod sessions;
mod socket;

pub use health::{health_check, readiness};
pub use history::{room_history, HistoryQuery};
pub use sessions::{logout, logout_all, refresh, RefreshRequest, RevokedSessions, TokenPair};
pub use socket::room_socket;

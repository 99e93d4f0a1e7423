//! Test fixtures and data generators

use std::sync::atomic::{AtomicU64, Ordering};

use lunar_core::User;
use serde_json::{json, Value};
use uuid::Uuid;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A user with a unique name
pub fn user(prefix: &str) -> User {
    User::new(Uuid::now_v7(), format!("{prefix}{}", unique_suffix()))
}

/// A unique 11-character room slug
pub fn room_slug() -> String {
    let digits = format!("{:010}", unique_suffix() + u64::from(std::process::id()) * 1_000_000);
    let tail = &digits[digits.len() - 10..];
    format!("r{tail}")
}

pub fn chat_message(room_id: Uuid, content: &str) -> Value {
    json!({
        "type": "chat_message",
        "payload": { "room_id": room_id, "content": content }
    })
}

pub fn join_room(room_id: Uuid) -> Value {
    json!({ "type": "join_room", "payload": { "room_id": room_id } })
}

pub fn leave_room(room_id: Uuid) -> Value {
    json!({ "type": "leave_room", "payload": { "room_id": room_id } })
}

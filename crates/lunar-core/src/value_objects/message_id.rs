//! Time-ordered message identifiers
//!
//! Message ids are UUIDv7 values: a 48-bit unix millisecond timestamp
//! followed by random bits. Within a single millisecond the generator
//! increments the random tail instead of drawing a new one, so ids
//! produced by one generator sort in creation order.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::{Builder, Uuid};

/// Identity and timestamp assigned to a message at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageStamp {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct GeneratorState {
    last_millis: u64,
    tail: [u8; 10],
}

/// Thread-safe generator of monotonic UUIDv7 message ids
pub struct MessageIdGenerator {
    state: Mutex<GeneratorState>,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generate the next stamp.
    ///
    /// `created_at` carries the same millisecond encoded in the id, so
    /// ordering by `(created_at, id)` and by `id` alone agree.
    pub fn next(&self) -> MessageStamp {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut state = self.state.lock();

        if now > state.last_millis {
            state.last_millis = now;
            state.tail = rand::random();
            // Leave headroom in the counter bits for same-millisecond bursts
            state.tail[3] &= 0x7F;
        } else {
            // Same millisecond, or the clock stepped backwards
            increment_tail(&mut state.tail);
        }

        let id = Builder::from_unix_timestamp_millis(state.last_millis, &state.tail).into_uuid();
        let created_at = i64::try_from(state.last_millis)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        MessageStamp { id, created_at }
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Big-endian increment over the tail bytes that land verbatim in the id.
///
/// Bytes 0..=2 share octets with the version and variant bits and are
/// never touched.
fn increment_tail(tail: &mut [u8; 10]) {
    for byte in tail[3..].iter_mut().rev() {
        let (next, overflow) = byte.overflowing_add(1);
        *byte = next;
        if !overflow {
            return;
        }
    }
}

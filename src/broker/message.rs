//! Message definitions for the broker
//!
//! `Message` is the canonical internal representation of one unit of work.
//! The payload is opaque to the engine: it is carried as a `String` and never
//! inspected or validated here.
//!
//! Notes on fields:
//! - `id`: unique id assigned at produce time, immutable afterwards
//! - `data`: opaque payload body as a String
//! - `topic`: routing label owned by the producer request; single-topic
//!   deployments leave it at the default
//! - `enqueued_at`: milliseconds since UNIX epoch, set once at produce time.
//!   Requeues never refresh it, so staleness metrics see the original
//!   submission time.
//! - `retries`: incremented only when a visibility timeout sends the message
//!   back to the queue; there is no consumer failure signal
//! - `state`: current lifecycle state, see `MessageState`

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic assigned to messages whose producer did not name one.
pub const DEFAULT_TOPIC: &str = "default";

/// Lifecycle states a message moves through.
///
/// `Acknowledged` and `DeadLettered` are terminal. The serialized form is the
/// lowercase state name, which is also the encoding used in the durable log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Enqueued,
    Inflight,
    Retried,
    Acknowledged,
    DeadLettered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub data: String,
    pub topic: String,
    pub enqueued_at: i64,
    pub retries: u8,
    pub state: MessageState,
}

impl Message {
    /// Create a fresh message for the given payload, stamped with the current
    /// time and a new unique id.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: data.into(),
            topic: DEFAULT_TOPIC.to_string(),
            enqueued_at: Utc::now().timestamp_millis(),
            retries: 0,
            state: MessageState::Enqueued,
        }
    }
}

/// A message that has been handed to a consumer and not yet settled.
///
/// This is the canonical location of a message's mutable state while it is
/// in-flight; the copy returned to the consumer is a snapshot.
#[derive(Debug, Clone)]
pub struct InFlightMessage {
    pub message: Message,
    pub processing_started_at: i64,
}

impl InFlightMessage {
    /// Whether the visibility timeout has elapsed without an acknowledgement.
    pub fn expired(&self, now_ms: i64, visibility_timeout_ms: i64) -> bool {
        now_ms - self.processing_started_at > visibility_timeout_ms
    }

    /// Whether the message has used up its retry budget.
    pub fn retries_exhausted(&self, max_retries: u8) -> bool {
        self.message.retries >= max_retries
    }
}

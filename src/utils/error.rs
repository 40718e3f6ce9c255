//! The `error` module defines custom error types used within the `relaymq`
//! application.
//!
//! Expected conditions never surface here: an empty queue is `None`, and an
//! acknowledge or requeue that lost a race is `false`. Errors are reserved
//! for the durable log, where an unreadable store at startup is fatal and a
//! failed background write is reported by the writer task.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("durable log storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("durable log record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("unsupported durable log record version {version}")]
    UnsupportedVersion { version: u32 },
}

//! Durable log backed by `sled`
//!
//! One record per message, keyed by message id. The value is a JSON-encoded
//! `StoredRecord` carrying an explicit format version so a future layout
//! change cannot be confused with a corrupt row.
//!
//! Writes are applied by a single writer task (`LogWriter`) that owns the
//! `sled` handle outright. Request paths send operations over a channel and
//! never wait for the disk; because one task applies them in send order,
//! writes for the same message keep their causal order. The channel is also
//! the drain point on shutdown.

use serde::{Deserialize, Serialize};
use sled::Db;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::broker::message::{DEFAULT_TOPIC, Message, MessageState};
use crate::utils::error::PersistenceError;

/// On-disk record format version. Bump on any layout change.
pub const RECORD_VERSION: u32 = 1;

/// The persisted shape of one message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub version: u32,
    pub id: String,
    pub data: String,
    pub state: MessageState,
    pub enqueued_at: i64,
}

impl StoredRecord {
    fn from_message(message: &Message) -> Self {
        Self {
            version: RECORD_VERSION,
            id: message.id.clone(),
            data: message.data.clone(),
            state: message.state,
            enqueued_at: message.enqueued_at,
        }
    }

    /// Rebuild a live message from its persisted row.
    ///
    /// Retry counts are not persisted, so replayed messages start with a
    /// fresh retry budget, and they re-enter the queue as `Enqueued`
    /// whatever state the crash left on disk.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            data: self.data,
            topic: DEFAULT_TOPIC.to_string(),
            enqueued_at: self.enqueued_at,
            retries: 0,
            state: MessageState::Enqueued,
        }
    }
}

/// Handle to the on-disk message log.
#[derive(Debug)]
pub struct DurableLog {
    db: Db,
}

impl DurableLog {
    /// Open or create the log at `path`.
    pub fn open(path: &str) -> Result<Self, PersistenceError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Insert a new row for a freshly produced message.
    pub fn insert(&self, message: &Message) -> Result<(), PersistenceError> {
        let record = StoredRecord::from_message(message);
        let bytes = serde_json::to_vec(&record)?;
        self.db.insert(record.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Update the payload and state of an existing row. Unknown ids are a
    /// no-op: the row may simply never have reached the disk.
    pub fn update(&self, id: &str, data: &str, state: MessageState) -> Result<(), PersistenceError> {
        let Some(bytes) = self.db.get(id.as_bytes())? else {
            debug!(message_id = %id, "update for a message the log never saw");
            return Ok(());
        };
        let mut record = decode(&bytes)?;
        record.data = data.to_string();
        record.state = state;
        self.db.insert(id.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(())
    }

    /// Mark a row acknowledged, excluding it from future recovery. Unknown
    /// ids are a no-op.
    pub fn mark_acknowledged(&self, id: &str) -> Result<(), PersistenceError> {
        let Some(bytes) = self.db.get(id.as_bytes())? else {
            debug!(message_id = %id, "acknowledge for a message the log never saw");
            return Ok(());
        };
        let mut record = decode(&bytes)?;
        record.state = MessageState::Acknowledged;
        self.db.insert(id.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(())
    }

    /// All rows that never reached the acknowledged state, ascending by
    /// original submission time. Run once at engine startup.
    pub fn unacknowledged(&self) -> Result<Vec<Message>, PersistenceError> {
        let mut messages = Vec::new();
        for entry in self.db.iter() {
            let (_, bytes) = entry?;
            let record = decode(&bytes)?;
            if record.state != MessageState::Acknowledged {
                messages.push(record.into_message());
            }
        }
        messages.sort_by_key(|message| message.enqueued_at);
        Ok(messages)
    }

    /// Force everything down to disk.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<StoredRecord, PersistenceError> {
    let record: StoredRecord = serde_json::from_slice(bytes)?;
    if record.version != RECORD_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            version: record.version,
        });
    }
    Ok(record)
}

enum LogOp {
    Insert(Message),
    Update {
        id: String,
        data: String,
        state: MessageState,
    },
    Ack {
        id: String,
    },
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap clonable sender half of the single-writer log task.
///
/// The `record_*` methods never block and never fail from the caller's point
/// of view; a write that cannot be applied is reported by the writer task at
/// error level and otherwise dropped.
#[derive(Clone)]
pub struct LogWriter {
    tx: mpsc::UnboundedSender<LogOp>,
}

impl LogWriter {
    /// Move the log into a dedicated writer task and return the sender
    /// handle. Must be called from within a tokio runtime.
    pub fn spawn(log: DurableLog) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(log, rx));
        Self { tx }
    }

    pub fn record_insert(&self, message: Message) {
        self.send(LogOp::Insert(message));
    }

    pub fn record_update(&self, id: String, data: String, state: MessageState) {
        self.send(LogOp::Update { id, data, state });
    }

    pub fn record_ack(&self, id: String) {
        self.send(LogOp::Ack { id });
    }

    /// Wait until every previously sent operation has been applied and
    /// synced to disk.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(LogOp::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Drain outstanding operations, sync, and release the store. Resolves
    /// once the underlying database handle has been dropped, so the same
    /// path can be reopened immediately afterwards.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(LogOp::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
    }

    fn send(&self, op: LogOp) {
        if self.tx.send(op).is_err() {
            error!("durable log writer is gone, dropping write");
        }
    }
}

async fn write_loop(log: DurableLog, mut rx: mpsc::UnboundedReceiver<LogOp>) {
    let mut stopped: Option<oneshot::Sender<()>> = None;

    while let Some(op) = rx.recv().await {
        match op {
            LogOp::Insert(message) => {
                if let Err(e) = log.insert(&message) {
                    error!(message_id = %message.id, error = %e, "failed to log produced message");
                }
            }
            LogOp::Update { id, data, state } => {
                if let Err(e) = log.update(&id, &data, state) {
                    error!(message_id = %id, error = %e, "failed to log state update");
                }
            }
            LogOp::Ack { id } => {
                if let Err(e) = log.mark_acknowledged(&id) {
                    error!(message_id = %id, error = %e, "failed to log acknowledgement");
                }
            }
            LogOp::Flush(ack) => {
                if let Err(e) = log.flush() {
                    error!(error = %e, "failed to flush durable log");
                }
                let _ = ack.send(());
            }
            LogOp::Shutdown(ack) => {
                if let Err(e) = log.flush() {
                    error!(error = %e, "failed to flush durable log on shutdown");
                }
                stopped = Some(ack);
                break;
            }
        }
    }

    // Release the database before confirming shutdown so the path can be
    // reopened by a restarting engine.
    drop(log);
    if let Some(ack) = stopped {
        let _ = ack.send(());
    }
}

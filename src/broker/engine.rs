//! Broker engine
//!
//! This module contains the composition root of the broker. It wires the
//! in-memory `QueueStore` to the durable log and owns the retry supervisor's
//! lifecycle. The public API is the four verbs the transports translate to:
//!
//! - `produce`: enqueue a payload, return its new message id
//! - `consume`: hand the queue head to a consumer, moving it in-flight
//! - `acknowledge`: settle an in-flight message
//! - `peek` / `get_all_messages` / `get_dead_letter`: inspection snapshots
//!
//! Concurrency and usage notes:
//! - All verbs take `&self` and serialize on the store's internal lock, so a
//!   `Broker` can be shared across request workers as `Arc<Broker>`. Nothing
//!   under the lock blocks on I/O.
//! - Durability is fire-and-forget from the caller's point of view: every
//!   state transition is sent to the single log-writer task and the request
//!   path never waits for the disk. `shutdown` drains outstanding writes.
//! - Recovery runs in `start`, before the supervisor is spawned and before
//!   any traffic can arrive: every message the log holds in a
//!   non-acknowledged state is replayed into a fresh queue in original
//!   submission order.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::broker::message::{Message, MessageState};
use crate::broker::store::QueueStore;
use crate::broker::supervisor;
use crate::config::BrokerSettings;
use crate::persistence::sled_store::{DurableLog, LogWriter};
use crate::utils::error::PersistenceError;

pub struct Broker {
    store: Arc<Mutex<QueueStore>>,
    log: LogWriter,
    supervisor: JoinHandle<()>,
}

impl Broker {
    /// Recover unacknowledged work from the durable log, then start the log
    /// writer and the retry supervisor.
    ///
    /// A failed recovery read is fatal: without it the crash-safety guarantee
    /// is void, so the engine refuses to start. Must be called from within a
    /// tokio runtime.
    pub fn start(settings: BrokerSettings, log: DurableLog) -> Result<Self, PersistenceError> {
        let mut store = QueueStore::new();
        let recovered = log.unacknowledged()?;
        if !recovered.is_empty() {
            info!(
                count = recovered.len(),
                "replaying unacknowledged messages from the durable log"
            );
        }
        for message in recovered {
            store.enqueue(message);
        }

        let store = Arc::new(Mutex::new(store));
        let log = LogWriter::spawn(log);
        let supervisor = tokio::spawn(supervisor::run(store.clone(), settings));

        Ok(Self {
            store,
            log,
            supervisor,
        })
    }

    /// Accept a payload, returning the id of the newly enqueued message.
    ///
    /// The id is returned as soon as the message is queued in memory; the
    /// durable log write happens in the background.
    pub fn produce(&self, data: impl Into<String>) -> String {
        let message = Message::new(data);
        let id = message.id.clone();
        self.store.lock().unwrap().enqueue(message.clone());
        self.log.record_insert(message);
        debug!(message_id = %id, "message produced");
        id
    }

    /// Hand the queue head to a consumer, moving it in-flight.
    ///
    /// Returns `None` when the queue is empty.
    pub fn consume(&self) -> Option<Message> {
        let message = self.store.lock().unwrap().dequeue()?;
        self.log
            .record_update(message.id.clone(), message.data.clone(), MessageState::Inflight);
        debug!(message_id = %message.id, "message consumed");
        Some(message)
    }

    /// Settle an in-flight message. Returns whether the id was actually
    /// in-flight; false covers both unknown and already-settled ids.
    pub fn acknowledge(&self, id: &str) -> bool {
        self.log.record_ack(id.to_string());
        let acked = self.store.lock().unwrap().acknowledge(id);
        if acked {
            debug!(message_id = %id, "message acknowledged");
        } else {
            debug!(message_id = %id, "acknowledge for unknown or already settled message");
        }
        acked
    }

    /// Read-only view of the current queue head.
    pub fn peek(&self) -> Option<Message> {
        self.store.lock().unwrap().peek().cloned()
    }

    /// Snapshot of every message the engine currently holds.
    pub fn get_all_messages(&self) -> Vec<Message> {
        self.store.lock().unwrap().all_messages()
    }

    /// Snapshot of the dead-letter collection.
    pub fn get_dead_letter(&self) -> Vec<Message> {
        self.store.lock().unwrap().dead_letter_messages()
    }

    /// Stop the supervisor and drain the log writer.
    ///
    /// Outstanding log writes always run to completion; exiting the process
    /// without calling this accepts the loss of whatever was still queued for
    /// the writer.
    pub async fn shutdown(&self) {
        self.supervisor.abort();
        self.log.shutdown().await;
        info!("broker engine stopped");
    }
}

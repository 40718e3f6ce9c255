//! Retry supervisor
//!
//! Background loop that enforces the visibility-timeout contract and the
//! bounded-retry policy without any consumer involvement. Each tick takes the
//! store lock once and runs two sweeps in order:
//!
//! 1. requeue every in-flight message whose visibility timeout expired
//! 2. dead-letter every remaining in-flight message that has used up its
//!    retry budget
//!
//! Running the ceiling sweep after the timeout sweep in the same tick means a
//! message that was just requeued is no longer in-flight and is not counted
//! again until it is dequeued and times out once more. A message therefore
//! crosses the in-flight state `max_retries` times before it is parked.
//!
//! The supervisor only touches the in-memory store; durable log updates stay
//! on the request path. Entries that vanish mid-tick because a concurrent
//! acknowledgement raced the sweep are skipped.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};

use crate::broker::store::QueueStore;
use crate::config::BrokerSettings;

/// Run the supervisor loop until the owning task is aborted.
pub(crate) async fn run(store: Arc<Mutex<QueueStore>>, settings: BrokerSettings) {
    let mut ticker = tokio::time::interval(settings.sweep_interval());
    // Skip the immediate first tick
    ticker.tick().await;

    info!(
        sweep_interval_secs = settings.sweep_interval_secs,
        visibility_timeout_secs = settings.visibility_timeout_secs,
        max_retries = settings.max_retries,
        "retry supervisor started"
    );

    loop {
        ticker.tick().await;
        sweep(&store, settings.visibility_timeout_ms(), settings.max_retries);
    }
}

/// A single supervisor tick. Separated from the loop so tests can drive
/// ticks deterministically.
pub(crate) fn sweep(store: &Mutex<QueueStore>, visibility_timeout_ms: i64, max_retries: u8) {
    let now = Utc::now().timestamp_millis();
    let mut store = store.lock().unwrap();

    for id in store.expired_inflight(now, visibility_timeout_ms) {
        if store.requeue_from_inflight(&id) {
            info!(message_id = %id, "visibility timeout expired, message requeued");
        }
    }

    for id in store.retry_exhausted_inflight(max_retries) {
        if store.dead_letter_from_inflight(&id) {
            warn!(message_id = %id, max_retries, "retry budget exhausted, message dead-lettered");
        }
    }
}

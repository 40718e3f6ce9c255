//! Queue store
//!
//! Holds the three collections a message can live in: the FIFO queue, the
//! in-flight map and the dead-letter collection. A message id is present in
//! at most one of them at any instant, and every transition between them goes
//! through a method on `QueueStore` so the invariant cannot be observed
//! violated.
//!
//! Concurrency note: the store itself is synchronous. Callers share it as
//! `Arc<Mutex<QueueStore>>` and must hold the lock for the duration of each
//! call; no method blocks on I/O, so hold times stay short.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;

use crate::broker::message::{InFlightMessage, Message, MessageState};

#[derive(Debug, Default)]
pub struct QueueStore {
    queue: VecDeque<Message>,
    in_flight: HashMap<String, InFlightMessage>,
    dead_letter: Vec<Message>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            dead_letter: Vec::new(),
        }
    }

    /// Append a message to the tail of the queue.
    pub fn enqueue(&mut self, message: Message) {
        self.queue.push_back(message);
    }

    /// Pop the head of the queue and move it to the in-flight map.
    ///
    /// Returns `None` when the queue is empty. That is the steady-state signal
    /// for "nothing to do", not a failure.
    pub fn dequeue(&mut self) -> Option<Message> {
        let mut message = self.queue.pop_front()?;
        message.state = MessageState::Inflight;
        let snapshot = message.clone();
        self.in_flight.insert(
            message.id.clone(),
            InFlightMessage {
                message,
                processing_started_at: Utc::now().timestamp_millis(),
            },
        );
        Some(snapshot)
    }

    /// Read-only view of the current queue head.
    pub fn peek(&self) -> Option<&Message> {
        self.queue.front()
    }

    /// Settle an in-flight message.
    ///
    /// Returns false when the id is not in-flight. "Never existed" and
    /// "already settled" are indistinguishable here by design; callers treat
    /// false as not-found, never as a hard error.
    pub fn acknowledge(&mut self, id: &str) -> bool {
        if let Some(mut inflight) = self.in_flight.remove(id) {
            inflight.message.state = MessageState::Acknowledged;
            return true;
        }
        false
    }

    /// Return a timed-out in-flight message to the tail of the queue,
    /// incrementing its retry count.
    ///
    /// Returns false when the id is no longer in-flight, which happens when a
    /// concurrent acknowledgement won the race. That race is benign.
    pub fn requeue_from_inflight(&mut self, id: &str) -> bool {
        if let Some(mut inflight) = self.in_flight.remove(id) {
            inflight.message.retries += 1;
            inflight.message.state = MessageState::Retried;
            self.enqueue(inflight.message);
            return true;
        }
        false
    }

    /// Move an in-flight message to the dead-letter collection.
    ///
    /// Terminal: dead-lettered messages never re-enter the queue or the
    /// in-flight map. Returns false when the id is no longer in-flight.
    pub fn dead_letter_from_inflight(&mut self, id: &str) -> bool {
        if let Some(mut inflight) = self.in_flight.remove(id) {
            inflight.message.state = MessageState::DeadLettered;
            self.dead_letter.push(inflight.message);
            return true;
        }
        false
    }

    /// Ids of in-flight messages whose visibility timeout has expired.
    pub fn expired_inflight(&self, now_ms: i64, visibility_timeout_ms: i64) -> Vec<String> {
        self.in_flight
            .iter()
            .filter(|(_, inflight)| inflight.expired(now_ms, visibility_timeout_ms))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of in-flight messages that have used up their retry budget.
    pub fn retry_exhausted_inflight(&self, max_retries: u8) -> Vec<String> {
        self.in_flight
            .iter()
            .filter(|(_, inflight)| inflight.retries_exhausted(max_retries))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Snapshot of every message the store currently holds, in queue order,
    /// then in-flight, then dead-letter.
    pub fn all_messages(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.queue.iter().cloned().collect();
        messages.extend(self.in_flight.values().map(|inflight| inflight.message.clone()));
        messages.extend(self.dead_letter.iter().cloned());
        messages
    }

    /// Snapshot of the dead-letter collection.
    pub fn dead_letter_messages(&self) -> Vec<Message> {
        self.dead_letter.clone()
    }
}

//! # RelayMQ
//!
//! `relaymq` is a minimalist, in-memory message broker engine built with Rust.
//! Producers submit opaque payloads, consumers dequeue them for processing and
//! must explicitly acknowledge success, or the message is redelivered once its
//! visibility timeout expires. Messages that exhaust their retry budget are
//! parked in a dead-letter collection. A durable log on disk lets the engine
//! replay unacknowledged work after a crash.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: The engine itself: the queue/in-flight/dead-letter store, the
//!   retry supervisor, and the produce/consume/acknowledge/inspect verbs.
//! - `config`: Handles loading and managing broker configuration.
//! - `persistence`: The durable log used for crash recovery (backed by `sled`).
//! - `utils`: Contains shared utilities, such as error types and logging setup.

pub mod broker;
pub mod config;
pub mod persistence;
pub mod utils;

//! The `persistence` module provides the durable log the engine recovers from.
//!
//! Every message gets one logical row on disk, keyed by its id, that tracks
//! the payload and the last persisted lifecycle state. At startup the engine
//! replays every row that never reached the acknowledged state, which is what
//! makes a crash between consume and acknowledge safe.
//!
//! It uses `sled` as an embedded key-value store for efficient and durable
//! record storage.

pub mod sled_store;

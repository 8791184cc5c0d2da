//! src/eventbus/mod.rs
//!
//! Chat message ingestion: a bounded, non-blocking producer queue drained by
//! a single background task that batches rows into storage.

pub mod batch_writer;
pub mod dead_letter;

pub use batch_writer::{spawn_batch_writer, BatchStats, BatchWriter, DROP_LOG_EVERY};
pub use dead_letter::{read_dead_letters, replay_dead_letters, FlushFailurePolicy};

//! src/platforms/source/mod.rs
//!
//! The chat source boundary. A source client (IRC or anything else) turns
//! what it receives into `SourceEvent`s; the service here translates them
//! and hands them to the writers. Nothing flows back to the source.

pub mod events;
pub mod runtime;

pub use events::{normalize_channel, RawChatMessage, RawNotice, RawUser, SourceEvent};
pub use runtime::run_json_source;

// File: chatlog-common/src/traits/storage_traits.rs

use std::sync::Arc;
use async_trait::async_trait;

use crate::Error;
use crate::models::{NoticeEvent, WriteBatch};

/// Batched write side for chat messages.
///
/// Implementations must execute the queued inserts in order and report
/// success or failure for the batch as a whole. A duplicate message id is
/// silently ignored, never an error. Deadlines are imposed by the caller.
#[async_trait]
pub trait ChatMessageSink: Send + Sync + 'static {
    async fn send_batch(&self, batch: &WriteBatch) -> Result<(), Error>;
}

/// Single-statement write side for notices. No dedup is required.
#[async_trait]
pub trait NoticeStore: Send + Sync + 'static {
    async fn insert_notice(&self, notice: &NoticeEvent) -> Result<(), Error>;
}

#[async_trait]
impl<T: ChatMessageSink + ?Sized> ChatMessageSink for Arc<T> {
    async fn send_batch(&self, batch: &WriteBatch) -> Result<(), Error> {
        (**self).send_batch(batch).await
    }
}

#[async_trait]
impl<T: NoticeStore + ?Sized> NoticeStore for Arc<T> {
    async fn insert_notice(&self, notice: &NoticeEvent) -> Result<(), Error> {
        (**self).insert_notice(notice).await
    }
}

// File: chatlog-core/src/services/notice_writer.rs

use std::time::Duration;

use tokio::time::timeout;

use chatlog_common::models::NoticeEvent;
use chatlog_common::traits::NoticeStore;

use crate::Error;

/// Writes notices one at a time, inline, each bounded by `timeout`.
///
/// Notices are rare, so unlike chat messages they skip the queue and the
/// batch writer entirely.
pub struct NoticeWriter<S> {
    store: S,
    timeout: Duration,
}

impl<S: NoticeStore> NoticeWriter<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn write(&self, notice: &NoticeEvent) -> Result<(), Error> {
        timeout(self.timeout, self.store.insert_notice(notice)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::{sample_notice, RecordingNoticeStore};

    #[tokio::test]
    async fn test_writes_inline() {
        let writer = NoticeWriter::new(RecordingNoticeStore::new(), Duration::from_secs(1));
        writer.write(&sample_notice("slow_on")).await.unwrap();
        writer.write(&sample_notice("slow_off")).await.unwrap();

        let ids: Vec<_> = writer.store.notices().into_iter().map(|n| n.msg_id).collect();
        assert_eq!(ids, vec!["slow_on", "slow_off"]);
    }

    #[tokio::test]
    async fn test_times_out() {
        let writer = NoticeWriter::new(
            RecordingNoticeStore::slow(Duration::from_millis(500)),
            Duration::from_millis(20),
        );
        let res = writer.write(&sample_notice("slow_on")).await;
        assert!(matches!(res, Err(Error::Timeout(_))));
        assert!(writer.store.notices().is_empty());
    }
}

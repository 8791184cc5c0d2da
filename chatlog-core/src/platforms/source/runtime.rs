//! src/platforms/source/runtime.rs
//!
//! Reads newline-delimited JSON `SourceEvent`s from any async reader and
//! feeds them to the `ChatLogService`. The binary points this at stdin so
//! any external source client can be piped in.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatlog_common::traits::NoticeStore;

use crate::Error;
use crate::services::ChatLogService;

use super::events::SourceEvent;

/// Runs until EOF or until `cancel` fires. Malformed lines are logged and
/// skipped. Returns the number of events handed to the service.
pub async fn run_json_source<R, N>(
    reader: R,
    service: &ChatLogService<N>,
    cancel: &CancellationToken,
) -> Result<u64, Error>
where
    R: AsyncRead + Unpin,
    N: NoticeStore,
{
    let mut reader = BufReader::new(reader);
    let mut line_buffer = String::new();
    let mut handled = 0u64;

    loop {
        line_buffer.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                info!("(json source) cancelled => stop reading");
                break;
            }
            read = reader.read_line(&mut line_buffer) => read?,
        };

        if read == 0 {
            info!("(json source) EOF after {} events", handled);
            break;
        }

        let line = line_buffer.trim();
        if line.is_empty() {
            continue;
        }
        debug!("<< {}", line);

        match serde_json::from_str::<SourceEvent>(line) {
            Ok(event) => {
                service.handle_event(event).await;
                handled += 1;
            }
            Err(e) => warn!("(json source) skipping malformed line: {}", e),
        }
    }

    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::BatchConfig;
    use crate::eventbus::{spawn_batch_writer, FlushFailurePolicy};
    use crate::services::NoticeWriter;
    use crate::test_utils::helpers::{RecordingNoticeStore, RecordingSink};

    #[tokio::test]
    async fn test_feeds_messages_and_notices() {
        let sink = Arc::new(RecordingSink::new());
        let notices = Arc::new(RecordingNoticeStore::new());
        let cancel = CancellationToken::new();

        let cfg = BatchConfig {
            max_batch_size: 10,
            flush_interval: Duration::from_secs(3600),
            ..BatchConfig::default()
        };
        let (writer, handle) =
            spawn_batch_writer(sink.clone(), cfg, FlushFailurePolicy::Discard, cancel.clone()).unwrap();
        let service = ChatLogService::new(writer, NoticeWriter::new(notices.clone(), Duration::from_secs(1)));

        let input = concat!(
            "{\"type\":\"connected\"}\n",
            "{\"type\":\"message\",\"id\":\"m1\",\"channel\":\"#c\",\"user\":{\"id\":\"1\",\"name\":\"a\"},\"message\":\"one\"}\n",
            "this is not json\n",
            "\n",
            "{\"type\":\"notice\",\"channel\":\"#c\",\"msg_id\":\"slow_on\",\"message\":\"slow\"}\n",
            "{\"type\":\"message\",\"id\":\"m2\",\"channel\":\"#c\",\"user\":{\"id\":\"2\",\"name\":\"b\"},\"message\":\"two\"}\n",
        );

        let handled = run_json_source(input.as_bytes(), &service, &cancel).await.unwrap();
        assert_eq!(handled, 4);

        let stored = notices.notices();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].msg_id, "slow_on");
        assert_eq!(stored[0].channel, "c");

        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.flushed_rows, 2);
        assert_eq!(sink.row_ids(), vec!["m1".to_string(), "m2".to_string()]);
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let sink = Arc::new(RecordingSink::new());
        let cancel = CancellationToken::new();
        let (writer, _handle) =
            spawn_batch_writer(sink, BatchConfig::default(), FlushFailurePolicy::Discard, cancel.clone()).unwrap();
        let service = ChatLogService::new(
            writer,
            NoticeWriter::new(Arc::new(RecordingNoticeStore::new()), Duration::from_secs(1)),
        );

        // A reader that never yields anything.
        let (_keep_open, reader) = tokio::io::duplex(64);
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        let handled = tokio::time::timeout(Duration::from_secs(2), run_json_source(reader, &service, &cancel))
            .await
            .expect("source should stop once cancelled")
            .unwrap();
        assert_eq!(handled, 0);
    }
}

// File: chatlog-core/src/eventbus/dead_letter.rs
//
// What happens to a batch whose flush failed. Batches are never retried
// in-process; the dead-letter file lets an operator replay them later,
// which is safe because chat inserts are keyed by message id.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use chatlog_common::models::{ChatMessageEvent, WriteBatch};
use chatlog_common::traits::ChatMessageSink;

use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlushFailurePolicy {
    /// Log the failure and forget the rows.
    #[default]
    Discard,
    /// Log the failure and append the rows, one JSON object per line, to `path`.
    DeadLetter { path: PathBuf },
}

impl FlushFailurePolicy {
    pub(crate) async fn handle_failed(&self, batch: WriteBatch) {
        match self {
            FlushFailurePolicy::Discard => {}
            FlushFailurePolicy::DeadLetter { path } => {
                match append_dead_letters(path, batch.messages()).await {
                    Ok(()) => warn!(
                        "batch writer: {} rows written to dead-letter file {}",
                        batch.len(),
                        path.display()
                    ),
                    Err(e) => error!(
                        "batch writer: could not dead-letter {} rows to {}: {}",
                        batch.len(),
                        path.display(),
                        e
                    ),
                }
            }
        }
    }
}

/// Appends `messages` to a JSON-lines file, creating it (and its directory) if needed.
pub async fn append_dead_letters(path: &Path, messages: &[ChatMessageEvent]) -> Result<(), Error> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }

    let mut buf = Vec::new();
    for msg in messages {
        serde_json::to_writer(&mut buf, msg)?;
        buf.push(b'\n');
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(&buf).await?;
    file.flush().await?;
    Ok(())
}

/// Reads every message from a dead-letter file, in file order. Blank lines are skipped.
pub async fn read_dead_letters(path: &Path) -> Result<Vec<ChatMessageEvent>, Error> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut out = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// Re-sends a dead-letter file through `sink` in batches of `max_batch_size`.
/// Stops at the first failed batch. Returns the number of rows sent.
pub async fn replay_dead_letters<S>(path: &Path, sink: &S, max_batch_size: usize) -> Result<usize, Error>
where
    S: ChatMessageSink,
{
    if max_batch_size == 0 {
        return Err(Error::Config("max_batch_size must be greater than zero".into()));
    }

    let messages = read_dead_letters(path).await?;
    let total = messages.len();
    let mut batch = WriteBatch::with_capacity(max_batch_size);
    let mut sent = 0;

    for msg in messages {
        batch.queue(msg);
        if batch.len() >= max_batch_size {
            let full = std::mem::replace(&mut batch, WriteBatch::with_capacity(max_batch_size));
            sink.send_batch(&full).await?;
            sent += full.len();
        }
    }
    if !batch.is_empty() {
        sink.send_batch(&batch).await?;
        sent += batch.len();
    }

    info!("dead-letter replay: {} of {} rows sent from {}", sent, total, path.display());
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::{sample_message, RecordingSink};

    #[tokio::test]
    async fn test_append_then_read_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dead.jsonl");

        append_dead_letters(&path, &[sample_message("a"), sample_message("b")]).await.unwrap();
        append_dead_letters(&path, &[sample_message("c")]).await.unwrap();

        let read = read_dead_letters(&path).await.unwrap();
        let ids: Vec<_> = read.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(read[0], sample_message("a"));
    }

    #[tokio::test]
    async fn test_replay_batches_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dead.jsonl");
        let msgs: Vec<_> = (0..5).map(|i| sample_message(&format!("m{i}"))).collect();
        append_dead_letters(&path, &msgs).await.unwrap();

        let sink = RecordingSink::new();
        let sent = replay_dead_letters(&path, &sink, 2).await.unwrap();
        assert_eq!(sent, 5);

        let sizes: Vec<_> = sink.batches().iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_replay_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let res = replay_dead_letters(&dir.path().join("nope.jsonl"), &sink, 10).await;
        assert!(matches!(res, Err(Error::Io(_))));
    }
}

//! src/eventbus/batch_writer.rs
//!
//! Spawns the task that owns the pending `WriteBatch`, and hands back a
//! cloneable `BatchWriter` for producers plus a `JoinHandle` for shutdown.
//!
//! A batch is flushed when it reaches `max_batch_size`, when the flush timer
//! ticks, or exactly once more when the cancellation token fires. Each flush runs
//! under its own `flush_timeout`, independent of the token, and is attempted
//! exactly once: failures are logged (and optionally dead-lettered) but the
//! rows still count as handled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatlog_common::models::{ChatMessageEvent, WriteBatch};
use chatlog_common::traits::ChatMessageSink;

use crate::Error;
use crate::config::BatchConfig;
use crate::eventbus::dead_letter::FlushFailurePolicy;

/// A drop is logged once per this many drops.
pub const DROP_LOG_EVERY: u64 = 100;

/// Point-in-time view of the writer's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Messages rejected because the queue was full (or already closed).
    pub dropped: u64,
    /// Rows handed to storage, including rows of failed flushes.
    pub flushed_rows: u64,
    /// Flushes that errored or timed out.
    pub failed_flushes: u64,
    /// Rows handed to storage since the last stats tick.
    pub interval_rows: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicU64,
    flushed_rows: AtomicU64,
    failed_flushes: AtomicU64,
    interval_rows: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> BatchStats {
        BatchStats {
            dropped: self.dropped.load(Ordering::Relaxed),
            flushed_rows: self.flushed_rows.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            interval_rows: self.interval_rows.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FlushTrigger {
    Size,
    Timer,
    Shutdown,
}

/// Producer side of the batch writer. Cheap to clone.
#[derive(Clone)]
pub struct BatchWriter {
    tx: mpsc::Sender<ChatMessageEvent>,
    counters: Arc<Counters>,
}

impl BatchWriter {
    /// Tries to queue `msg` without waiting. Returns `false` and drops the
    /// message when the queue is full.
    pub fn enqueue(&self, msg: ChatMessageEvent) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(err) => {
                let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % DROP_LOG_EVERY == 0 {
                    let reason = match err {
                        TrySendError::Full(_) => "queue full",
                        TrySendError::Closed(_) => "writer stopped",
                    };
                    warn!("batch writer: {}, dropped {} messages total", reason, dropped);
                }
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> BatchStats {
        self.counters.snapshot()
    }
}

/// Validates `config`, then spawns the flush loop on the current runtime.
///
/// The loop runs until `cancel` fires (or every `BatchWriter` clone is
/// dropped), performs one final flush and resolves the handle with the
/// final counters.
pub fn spawn_batch_writer<S>(
    sink: S,
    config: BatchConfig,
    policy: FlushFailurePolicy,
    cancel: CancellationToken,
) -> Result<(BatchWriter, JoinHandle<BatchStats>), Error>
where
    S: ChatMessageSink,
{
    config.validate()?;

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let counters = Arc::new(Counters::default());

    let flush_loop = FlushLoop {
        batch: WriteBatch::with_capacity(config.max_batch_size),
        rx,
        sink,
        config,
        policy,
        counters: counters.clone(),
    };
    let handle = tokio::spawn(flush_loop.run(cancel));

    Ok((BatchWriter { tx, counters }, handle))
}

struct FlushLoop<S> {
    rx: mpsc::Receiver<ChatMessageEvent>,
    sink: S,
    config: BatchConfig,
    policy: FlushFailurePolicy,
    counters: Arc<Counters>,
    batch: WriteBatch,
}

impl<S: ChatMessageSink> FlushLoop<S> {
    async fn run(mut self, cancel: CancellationToken) -> BatchStats {
        let mut flush_ticker = ticker(self.config.flush_interval);
        let mut stats_ticker = ticker(self.config.stats_interval);

        info!(
            "batch writer started: max_batch={} flush_every={:?} queue={} flush_timeout={:?}",
            self.config.max_batch_size,
            self.config.flush_interval,
            self.config.queue_capacity,
            self.config.flush_timeout,
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("batch writer: cancelled => final flush");
                    break;
                }
                _ = flush_ticker.tick() => {
                    self.flush(FlushTrigger::Timer).await;
                }
                _ = stats_ticker.tick() => {
                    self.log_stats();
                }
                maybe_msg = self.rx.recv() => {
                    match maybe_msg {
                        Some(msg) => self.push(msg).await,
                        None => {
                            info!("batch writer: all producers gone => final flush");
                            break;
                        }
                    }
                }
            }
        }

        // Messages accepted before the close join the final batch; the size
        // trigger no longer applies, so shutdown costs at most one flush_timeout.
        self.rx.close();
        while let Ok(msg) = self.rx.try_recv() {
            self.batch.queue(msg);
        }
        self.flush(FlushTrigger::Shutdown).await;

        let stats = self.counters.snapshot();
        info!(
            "batch writer: stopped, total rows = {} (failed flushes {}, dropped {})",
            stats.flushed_rows, stats.failed_flushes, stats.dropped
        );
        stats
    }

    async fn push(&mut self, msg: ChatMessageEvent) {
        self.batch.queue(msg);
        if self.batch.len() >= self.config.max_batch_size {
            self.flush(FlushTrigger::Size).await;
        }
    }

    async fn flush(&mut self, trigger: FlushTrigger) {
        if self.batch.is_empty() {
            return;
        }

        let batch = std::mem::replace(
            &mut self.batch,
            WriteBatch::with_capacity(self.config.max_batch_size),
        );
        let rows = batch.len() as u64;
        debug!("batch writer: {:?} flush of {} rows", trigger, rows);

        let result = match timeout(self.config.flush_timeout, self.sink.send_batch(&batch)).await {
            Ok(res) => res,
            Err(elapsed) => Err(Error::Timeout(elapsed)),
        };

        if let Err(e) = result {
            self.counters.failed_flushes.fetch_add(1, Ordering::Relaxed);
            error!("batch writer: {:?} flush of {} rows failed: {}", trigger, rows, e);
            self.policy.handle_failed(batch).await;
        }

        self.counters.flushed_rows.fetch_add(rows, Ordering::Relaxed);
        self.counters.interval_rows.fetch_add(rows, Ordering::Relaxed);
    }

    fn log_stats(&self) {
        let interval_rows = self.counters.interval_rows.swap(0, Ordering::Relaxed);
        info!(
            "batch writer: inserted {} rows in last {:?} (total {})",
            interval_rows,
            self.config.stats_interval,
            self.counters.flushed_rows.load(Ordering::Relaxed),
        );
    }
}

/// Periodic timer whose first tick is one full period away.
fn ticker(period: Duration) -> Interval {
    let mut t = interval_at(Instant::now() + period, period);
    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
    t
}

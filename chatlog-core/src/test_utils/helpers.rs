// File: chatlog-core/src/test_utils/helpers.rs
//
// In-memory stand-ins for the storage, token store and token fetch
// collaborators, shared by unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Notify};
use tokio::time::{sleep, Instant};

use chatlog_common::models::{Badges, ChatMessageEvent, NoticeEvent, Token, WriteBatch};
use chatlog_common::traits::{AppTokenFetcher, ChatMessageSink, NoticeStore, TokenStore};

use crate::Error;

/// A chat message with fixed content and the given id.
pub fn sample_message(id: &str) -> ChatMessageEvent {
    let mut badges = Badges::new();
    badges.insert("subscriber".to_string(), 3);
    ChatMessageEvent {
        id: id.to_string(),
        channel: "ch".to_string(),
        user_id: "u1".to_string(),
        username: "name".to_string(),
        display_name: "Name".to_string(),
        text: format!("hello from {id}"),
        badges,
        color: "#FF0000".to_string(),
        is_moderator: false,
        is_subscriber: true,
        bits: 0,
        sent_at: DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
    }
}

pub fn sample_notice(msg_id: &str) -> NoticeEvent {
    NoticeEvent {
        channel: "ch".to_string(),
        msg_id: msg_id.to_string(),
        message: "This room is now in slow mode.".to_string(),
        tags: HashMap::from([("msg-id".to_string(), msg_id.to_string())]),
        notice_at: DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default(),
    }
}

/// Records every batch it is handed. Can be told to fail, to stall, or to
/// park its first call until released.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<ChatMessageEvent>>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    entered: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    /// Every call sleeps for `delay` before returning.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// The first call blocks until the returned sender fires (or is dropped).
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::default()
        };
        (sink, tx)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every batch handed over so far, including failed ones.
    pub fn batches(&self) -> Vec<Vec<ChatMessageEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|m| m.id)
            .collect()
    }

    /// Waits for the first `send_batch` call to begin.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Polls until at least `expected` batches arrived or `within` elapsed.
    pub async fn wait_for_batches(&self, expected: usize, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if self.batch_count() >= expected {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        self.batch_count() >= expected
    }
}

#[async_trait]
impl ChatMessageSink for RecordingSink {
    async fn send_batch(&self, batch: &WriteBatch) -> Result<(), Error> {
        let fail = self.failing.load(Ordering::SeqCst);
        self.batches.lock().unwrap().push(batch.messages().to_vec());
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if fail {
            return Err(Error::Io(std::io::Error::other("simulated storage failure")));
        }
        Ok(())
    }
}

/// Records notices; optionally stalls every write.
#[derive(Default)]
pub struct RecordingNoticeStore {
    notices: Mutex<Vec<NoticeEvent>>,
    delay: Option<Duration>,
}

impl RecordingNoticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn notices(&self) -> Vec<NoticeEvent> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoticeStore for RecordingNoticeStore {
    async fn insert_notice(&self, notice: &NoticeEvent) -> Result<(), Error> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Token store kept in memory, with call counters and injectable failures.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
    load_error: Mutex<Option<String>>,
    fail_save: AtomicBool,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        *store.token.lock().unwrap() = Some(token);
        store
    }

    pub fn fail_loads_with(&self, message: &str) {
        *self.load_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_saves(&self) {
        self.fail_save.store(true, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<Token> {
        self.token.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load_app_token(&self) -> Result<Option<Token>, Error> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.load_error.lock().unwrap().clone() {
            return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, msg)));
        }
        Ok(self.token.lock().unwrap().clone())
    }

    async fn save_app_token(&self, token: &Token) -> Result<(), Error> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("simulated save failure")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.token.lock().unwrap() = Some(token.clone());
        Ok(())
    }
}

/// Hands out `token-1`, `token-2`, ... and counts calls.
pub struct CountingFetcher {
    pub calls: AtomicUsize,
    ttl: Duration,
    delay: Option<Duration>,
    failing: bool,
}

impl CountingFetcher {
    pub fn new(ttl: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            ttl,
            delay: None,
            failing: false,
        }
    }

    pub fn slow(ttl: Duration, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(ttl)
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(Duration::from_secs(3600))
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppTokenFetcher for CountingFetcher {
    async fn fetch_app_token(&self) -> Result<(String, Duration), Error> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.failing {
            return Err(Error::Auth("twitch oauth: unexpected status 401".into()));
        }
        Ok((format!("token-{n}"), self.ttl))
    }
}

/// A token expiring `in_secs` seconds from now.
pub fn token_expiring_in(access: &str, in_secs: i64) -> Token {
    Token::new(access, Utc::now() + chrono::Duration::seconds(in_secs))
}

// File: chatlog-common/src/models/notice.rs

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server NOTICE for a channel. Written inline, never queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeEvent {
    pub channel: String,
    pub msg_id: String,
    pub message: String,
    pub tags: HashMap<String, String>,
    pub notice_at: DateTime<Utc>,
}

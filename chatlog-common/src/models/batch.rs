// File: chatlog-common/src/models/batch.rs

use crate::models::ChatMessageEvent;

/// Ordered inserts accumulated between two flushes.
///
/// Each entry becomes one `insert ... on conflict (message_id) do nothing`,
/// keyed by the message id. A flushed batch is handed over whole and a fresh
/// one takes its place; batches are never cleared and reused.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    messages: Vec<ChatMessageEvent>,
}

impl WriteBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: Vec::with_capacity(capacity),
        }
    }

    pub fn queue(&mut self, msg: ChatMessageEvent) {
        self.messages.push(msg);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ChatMessageEvent] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessageEvent> {
        self.messages
    }
}

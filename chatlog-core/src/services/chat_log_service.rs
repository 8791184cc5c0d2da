// File: chatlog-core/src/services/chat_log_service.rs

use tracing::{debug, error, info};

use chatlog_common::models::{ChatMessageEvent, NoticeEvent};
use chatlog_common::traits::NoticeStore;

use crate::eventbus::BatchWriter;
use crate::platforms::source::SourceEvent;
use crate::services::NoticeWriter;

/// Routes source events: chat messages to the batch writer, notices
/// straight to storage.
pub struct ChatLogService<N> {
    writer: BatchWriter,
    notices: NoticeWriter<N>,
}

impl<N: NoticeStore> ChatLogService<N> {
    pub fn new(writer: BatchWriter, notices: NoticeWriter<N>) -> Self {
        Self { writer, notices }
    }

    pub async fn handle_event(&self, event: SourceEvent) {
        match event {
            SourceEvent::Connected => info!("(ChatLogService) source connected"),
            SourceEvent::Message(raw) => self.handle_chat(raw.into()),
            SourceEvent::Notice(raw) => self.handle_notice(raw.into()).await,
        }
    }

    /// Never waits; a full queue drops the message.
    pub fn handle_chat(&self, msg: ChatMessageEvent) {
        let channel = msg.channel.clone();
        if !self.writer.enqueue(msg) {
            debug!("batch writer: message for channel {} dropped", channel);
        }
    }

    pub async fn handle_notice(&self, notice: NoticeEvent) {
        info!("twitch NOTICE #{} [{}]: {}", notice.channel, notice.msg_id, notice.message);
        if let Err(e) = self.notices.write(&notice).await {
            error!("twitch NOTICE save failed for #{}: {}", notice.channel, e);
        }
    }
}

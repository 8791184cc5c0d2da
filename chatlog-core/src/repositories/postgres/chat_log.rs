// src/repositories/postgres/chat_log.rs
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};

use chatlog_common::models::{NoticeEvent, WriteBatch};
use chatlog_common::traits::{ChatMessageSink, NoticeStore};

use crate::Error;

const INSERT_CHAT_MESSAGE: &str = r#"
    INSERT INTO chat_messages (
        message_id, channel, user_id, username, display_name, text, badges, color,
        is_mod, is_subscriber, bits, sent_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ON CONFLICT (message_id) DO NOTHING
"#;

const INSERT_NOTICE: &str = r#"
    INSERT INTO channel_notices (
        channel, msg_id, message, tags, notice_at
    )
    VALUES ($1, $2, $3, $4, $5)
"#;

/// Postgres-backed storage for chat messages and notices.
#[derive(Clone)]
pub struct PostgresChatLogRepository {
    pool: Pool<Postgres>,
}

impl PostgresChatLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatMessageSink for PostgresChatLogRepository {
    /// One transaction per batch, statements in queue order. Duplicate
    /// message ids are skipped by the conflict clause.
    async fn send_batch(&self, batch: &WriteBatch) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        for msg in batch.messages() {
            sqlx::query(INSERT_CHAT_MESSAGE)
                .bind(&msg.id)
                .bind(&msg.channel)
                .bind(&msg.user_id)
                .bind(&msg.username)
                .bind(&msg.display_name)
                .bind(&msg.text)
                .bind(Json(&msg.badges))
                .bind(&msg.color)
                .bind(msg.is_moderator)
                .bind(msg.is_subscriber)
                .bind(msg.bits)
                .bind(msg.sent_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl NoticeStore for PostgresChatLogRepository {
    async fn insert_notice(&self, notice: &NoticeEvent) -> Result<(), Error> {
        sqlx::query(INSERT_NOTICE)
            .bind(&notice.channel)
            .bind(&notice.msg_id)
            .bind(&notice.message)
            .bind(Json(&notice.tags))
            .bind(notice.notice_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// chatlog-core/src/db/mod.rs

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::Error;
use crate::config::PostgresConfig;
use crate::repositories::PostgresChatLogRepository;

/// The batch writer and the notice writer each hold at most one connection.
const MAX_CONNECTIONS: u32 = 4;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Postgres pool backing the chat log tables.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(cfg: &PostgresConfig) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&cfg.dsn())
            .await?;

        info!("postgres: connected to {}:{}/{}", cfg.host, cfg.port, cfg.db);
        Ok(Self { pool })
    }

    /// Creates or upgrades `chat_messages` and `channel_notices`.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("postgres: chat log schema is up to date");
        Ok(())
    }

    pub fn chat_log_repository(&self) -> PostgresChatLogRepository {
        PostgresChatLogRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_settings() {
        let cfg = PostgresConfig {
            host: "localhost".into(),
            port: "not-a-port".into(),
            db: "chatlog".into(),
            user: "u".into(),
            password: "p".into(),
        };
        let res = Database::connect(&cfg).await;
        assert!(matches!(res, Err(Error::Database(_))));
    }
}

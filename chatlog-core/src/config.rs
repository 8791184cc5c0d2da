// File: chatlog-core/src/config.rs
//
// Environment-driven configuration. Everything goes through a lookup
// function so tests can feed a map instead of touching the process env.

use std::path::PathBuf;
use std::time::Duration;

use crate::Error;
use crate::auth::file_store::DEFAULT_TOKEN_FILE;
use crate::eventbus::dead_letter::FlushFailurePolicy;

/// Knobs for the chat message batch writer. All values must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Pending rows that force an immediate flush.
    pub max_batch_size: usize,
    /// Period of the flush timer.
    pub flush_interval: Duration,
    /// Capacity of the producer queue; enqueues beyond it are dropped.
    pub queue_capacity: usize,
    /// Period of the throughput log line.
    pub stats_interval: Duration,
    /// Upper bound on a single database write.
    pub flush_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            flush_interval: Duration::from_millis(1500),
            queue_capacity: 4096,
            stats_interval: Duration::from_secs(5 * 60),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be greater than zero".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(Error::Config("flush_interval must be greater than zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be greater than zero".into()));
        }
        if self.stats_interval.is_zero() {
            return Err(Error::Config("stats_interval must be greater than zero".into()));
        }
        if self.flush_timeout.is_zero() {
            return Err(Error::Config("flush_timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Connection parameters for the Postgres pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: String,
    pub db: String,
    pub user: String,
    pub password: String,
}

impl PostgresConfig {
    pub fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

/// Client credentials for the app access token. Only `auth app` needs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchAppConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl TwitchAppConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            client_id: required(&lookup, "TWITCH_CLIENT_ID")?,
            client_secret: required(&lookup, "TWITCH_CLIENT_SECRET")?,
        })
    }
}

/// Everything the `run` command needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub postgres: PostgresConfig,
    pub batch: BatchConfig,
    pub token_file: PathBuf,
    pub dead_letter_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(env_lookup)
    }

    /// Builds and validates a config from `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let postgres = PostgresConfig {
            host: required(&lookup, "POSTGRES_HOST")?,
            port: required(&lookup, "POSTGRES_PORT")?,
            db: required(&lookup, "POSTGRES_DB")?,
            user: required(&lookup, "POSTGRES_USER")?,
            password: required(&lookup, "POSTGRES_PASSWORD")?,
        };

        let defaults = BatchConfig::default();
        let batch = BatchConfig {
            max_batch_size: parsed(&lookup, "CHATLOG_BATCH_MAX")?
                .unwrap_or(defaults.max_batch_size),
            flush_interval: parsed(&lookup, "CHATLOG_FLUSH_EVERY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_interval),
            queue_capacity: parsed(&lookup, "CHATLOG_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            stats_interval: parsed(&lookup, "CHATLOG_STATS_EVERY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_interval),
            flush_timeout: parsed(&lookup, "CHATLOG_FLUSH_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_timeout),
        };
        batch.validate()?;

        let token_file = Self::token_file_from_lookup(&lookup);
        let dead_letter_file = optional(&lookup, "CHATLOG_DEAD_LETTER_FILE").map(PathBuf::from);

        Ok(Self {
            postgres,
            batch,
            token_file,
            dead_letter_file,
        })
    }

    /// `CHATLOG_TOKEN_FILE`, or `DEFAULT_TOKEN_FILE` when unset.
    pub fn token_file_from_env() -> PathBuf {
        Self::token_file_from_lookup(&env_lookup)
    }

    fn token_file_from_lookup<F>(lookup: &F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        optional(lookup, "CHATLOG_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE))
    }

    pub fn flush_failure_policy(&self) -> FlushFailurePolicy {
        match &self.dead_letter_file {
            Some(path) => FlushFailurePolicy::DeadLetter { path: path.clone() },
            None => FlushFailurePolicy::Discard,
        }
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| Error::Config(format!("{key} is required")))
}

fn parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>, Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}: invalid value '{raw}': {e}"))),
        None => Ok(None),
    }
}

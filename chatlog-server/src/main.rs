use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use chatlog_core::auth::{AppTokenManager, FileTokenStore};
use chatlog_core::config::{Config, TwitchAppConfig};
use chatlog_core::eventbus::{replay_dead_letters, spawn_batch_writer};
use chatlog_core::platforms::source::run_json_source;
use chatlog_core::platforms::twitch_helix::TwitchAppTokenFetcher;
use chatlog_core::services::{ChatLogService, NoticeWriter};
use chatlog_core::Database;

#[derive(Parser, Debug)]
#[command(name = "chatlog")]
#[command(author, version, about = "Chat logger - batches chat messages into Postgres")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read JSON-lines source events from stdin and log them to Postgres.
    Run,
    /// Obtain or refresh stored credentials.
    Auth {
        #[command(subcommand)]
        target: AuthTarget,
    },
    /// Re-send a dead-letter file. Already stored rows are skipped.
    Replay {
        /// Defaults to CHATLOG_DEAD_LETTER_FILE.
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthTarget {
    /// App access token via the client-credentials grant.
    App,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatlog=info,chatlog_core=info"));
    fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let result = runtime.block_on(async move {
        match args.command {
            Command::Run => run_logger().await,
            Command::Auth { target: AuthTarget::App } => run_auth_app().await,
            Command::Replay { path } => run_replay(path).await,
        }
    });

    // A pending stdin read lives on a blocking thread; don't wait for it.
    runtime.shutdown_timeout(Duration::from_secs(1));

    if let Err(e) = &result {
        error!("chatlog failed: {:#}", e);
    }
    result
}

/// Cancels `cancel` on Ctrl-C or SIGTERM.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    error!("could not install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("shutdown signal received");
        cancel.cancel();
    });
}

async fn run_logger() -> anyhow::Result<()> {
    let cfg = Config::from_env().context("config load failed")?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let db = Database::connect(&cfg.postgres)
        .await
        .context("connecting to Postgres")?;
    db.migrate().await.context("applying migrations")?;
    let repo = db.chat_log_repository();

    let (writer, writer_handle) = spawn_batch_writer(
        repo.clone(),
        cfg.batch.clone(),
        cfg.flush_failure_policy(),
        cancel.clone(),
    )?;
    let notices = NoticeWriter::new(repo, cfg.batch.flush_timeout);
    let service = ChatLogService::new(writer, notices);

    let source_result = run_json_source(tokio::io::stdin(), &service, &cancel).await;

    info!("shutting down...");
    cancel.cancel();
    drop(service);
    let stats = writer_handle.await.context("batch writer task panicked")?;
    info!(
        "final stats: rows={} failed_flushes={} dropped={}",
        stats.flushed_rows, stats.failed_flushes, stats.dropped
    );

    source_result.context("reading source events")?;
    Ok(())
}

async fn run_auth_app() -> anyhow::Result<()> {
    let twitch = TwitchAppConfig::from_env().context("config load failed")?;
    let token_file = Config::token_file_from_env();

    let store = FileTokenStore::new(token_file);
    let fetcher = TwitchAppTokenFetcher::new(twitch.client_id, twitch.client_secret);
    let manager = AppTokenManager::new(store, fetcher);

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let token = manager.get(&cancel).await.context("get app token")?;
    println!(
        "ok, expires at {}",
        token.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    Ok(())
}

async fn run_replay(path: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = Config::from_env().context("config load failed")?;
    let path = path
        .or_else(|| cfg.dead_letter_file.clone())
        .context("no dead-letter file given and CHATLOG_DEAD_LETTER_FILE is unset")?;
    let db = Database::connect(&cfg.postgres)
        .await
        .context("connecting to Postgres")?;
    let repo = db.chat_log_repository();

    let sent = replay_dead_letters(&path, &repo, cfg.batch.max_batch_size)
        .await
        .with_context(|| format!("replaying {}", path.display()))?;
    println!("replayed {sent} rows");
    Ok(())
}

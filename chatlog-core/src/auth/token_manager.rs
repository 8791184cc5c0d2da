// File: chatlog-core/src/auth/token_manager.rs

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chatlog_common::models::Token;
use chatlog_common::traits::{AppTokenFetcher, TokenStore};

use crate::Error;

/// Hands out the app access token, refreshing it when it is missing or
/// within the refresh margin of expiry.
///
/// All callers go through one critical section, so a refresh happens at
/// most once at a time and callers queued behind it see the new token
/// instead of fetching their own. No retries: errors go back to the caller.
pub struct AppTokenManager<S, F> {
    store: S,
    fetcher: F,
    lock: Mutex<()>,
}

impl<S, F> AppTokenManager<S, F>
where
    S: TokenStore,
    F: AppTokenFetcher,
{
    pub fn new(store: S, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            lock: Mutex::new(()),
        }
    }

    pub async fn get(&self, cancel: &CancellationToken) -> Result<Token, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let _guard = self.lock.lock().await;

        if let Some(token) = self.store.load_app_token().await? {
            if token.is_usable() {
                debug!("(AppTokenManager) cached token valid until {}", token.expires_at);
                return Ok(token);
            }
            debug!("(AppTokenManager) cached token expires at {} => refreshing", token.expires_at);
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (access, ttl) = self.fetcher.fetch_app_token().await?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| Error::Auth(format!("token lifetime out of range: {e}")))?;
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::Auth(format!("token lifetime out of range: {}s", ttl.num_seconds())))?;
        let token = Token::new(access, expires_at);

        self.store.save_app_token(&token).await?;
        info!("(AppTokenManager) fetched new app token, expires at {}", token.expires_at);

        Ok(token)
    }
}

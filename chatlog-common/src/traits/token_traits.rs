// File: chatlog-common/src/traits/token_traits.rs

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;

use crate::Error;
use crate::models::Token;

/// Durable home of the app token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    async fn load_app_token(&self) -> Result<Option<Token>, Error>;

    /// Overwrites whatever was stored before.
    async fn save_app_token(&self, token: &Token) -> Result<(), Error>;
}

/// Obtains a brand new app token: the access value and its time-to-live.
#[async_trait]
pub trait AppTokenFetcher: Send + Sync {
    async fn fetch_app_token(&self) -> Result<(String, Duration), Error>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn load_app_token(&self) -> Result<Option<Token>, Error> {
        (**self).load_app_token().await
    }

    async fn save_app_token(&self, token: &Token) -> Result<(), Error> {
        (**self).save_app_token(token).await
    }
}

#[async_trait]
impl<T: AppTokenFetcher + ?Sized> AppTokenFetcher for Arc<T> {
    async fn fetch_app_token(&self) -> Result<(String, Duration), Error> {
        (**self).fetch_app_token().await
    }
}

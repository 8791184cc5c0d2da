use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::debug;

use chatlog_common::traits::AppTokenFetcher;

use crate::Error;

pub const TWITCH_OAUTH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// The parts of Twitch's token endpoint JSON we use.
#[derive(Deserialize)]
struct AppTokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Client-credentials grant against the Twitch token endpoint.
pub struct TwitchAppTokenFetcher {
    client_id: String,
    client_secret: String,
    token_url: String,
    http: ReqwestClient,
}

impl TwitchAppTokenFetcher {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into().trim().to_string(),
            client_secret: client_secret.into().trim().to_string(),
            token_url: TWITCH_OAUTH_TOKEN_URL.to_string(),
            http: ReqwestClient::new(),
        }
    }

    /// Points the fetcher at a different token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

#[async_trait]
impl AppTokenFetcher for TwitchAppTokenFetcher {
    async fn fetch_app_token(&self) -> Result<(String, Duration), Error> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];

        debug!("(TwitchAppTokenFetcher) POST {}", self.token_url);
        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("twitch oauth: request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "twitch oauth: unexpected status {}: {}",
                status,
                body.trim()
            )));
        }

        let payload = resp
            .json::<AppTokenResponse>()
            .await
            .map_err(|e| Error::Auth(format!("twitch oauth: decode response: {e}")))?;

        Ok((payload.access_token, Duration::from_secs(payload.expires_in)))
    }
}

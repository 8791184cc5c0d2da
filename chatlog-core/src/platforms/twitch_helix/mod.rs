pub mod auth;

pub use auth::{TwitchAppTokenFetcher, TWITCH_OAUTH_TOKEN_URL};

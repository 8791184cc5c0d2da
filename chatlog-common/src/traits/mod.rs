// File: chatlog-common/src/traits/mod.rs
pub mod storage_traits;
pub mod token_traits;

pub use storage_traits::{ChatMessageSink, NoticeStore};
pub use token_traits::{AppTokenFetcher, TokenStore};

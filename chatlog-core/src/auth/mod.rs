// File: chatlog-core/src/auth/mod.rs

pub mod file_store;
pub mod token_manager;

pub use file_store::{FileTokenStore, DEFAULT_TOKEN_FILE};
pub use token_manager::AppTokenManager;

// src/lib.rs

pub mod auth;
pub mod config;
pub mod db;
pub mod eventbus;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod test_utils;

pub use chatlog_common::error::Error;
pub use chatlog_common::models;
pub use chatlog_common::traits;
pub use db::Database;
pub use config::{BatchConfig, Config};

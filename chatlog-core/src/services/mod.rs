// File: chatlog-core/src/services/mod.rs

pub mod chat_log_service;
pub mod notice_writer;

pub use chat_log_service::ChatLogService;
pub use notice_writer::NoticeWriter;

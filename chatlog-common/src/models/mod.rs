// File: chatlog-common/src/models/mod.rs
pub mod batch;
pub mod chat_message;
pub mod notice;
pub mod token;

pub use batch::WriteBatch;
pub use chat_message::{Badges, ChatMessageEvent};
pub use notice::NoticeEvent;
pub use token::{Token, REFRESH_MARGIN_SECS};

// File: chatlog-core/src/platforms/source/events.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatlog_common::models::{Badges, ChatMessageEvent, NoticeEvent};

/// What a source client delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    /// Connection established; joining channels is the source's business.
    Connected,
    Message(RawChatMessage),
    Notice(RawNotice),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub badges: Badges,
}

/// A PRIVMSG as an IRC client library hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChatMessage {
    pub id: String,
    pub channel: String,
    pub user: RawUser,
    pub message: String,
    #[serde(default)]
    pub bits: i32,
    /// Server timestamp, when the source provides one.
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotice {
    pub channel: String,
    pub msg_id: String,
    pub message: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// `" #Channel "` => `"Channel"`.
pub fn normalize_channel(channel: &str) -> String {
    channel.trim().trim_start_matches('#').to_string()
}

impl From<RawChatMessage> for ChatMessageEvent {
    fn from(m: RawChatMessage) -> Self {
        let is_moderator = ChatMessageEvent::badges_grant_moderator(&m.user.badges);
        let is_subscriber = ChatMessageEvent::badges_grant_subscriber(&m.user.badges);

        ChatMessageEvent {
            id: m.id,
            channel: normalize_channel(&m.channel),
            user_id: m.user.id,
            username: m.user.name,
            display_name: m.user.display_name,
            text: m.message,
            badges: m.user.badges,
            color: m.user.color,
            is_moderator,
            is_subscriber,
            bits: m.bits,
            sent_at: m.time.unwrap_or_else(Utc::now),
        }
    }
}

impl From<RawNotice> for NoticeEvent {
    fn from(n: RawNotice) -> Self {
        let notice_at = notice_timestamp(&n.tags);
        NoticeEvent {
            channel: normalize_channel(&n.channel),
            msg_id: n.msg_id,
            message: n.message,
            tags: n.tags,
            notice_at,
        }
    }
}

/// `tmi-sent-ts` (unix millis) if present and sane, otherwise now.
fn notice_timestamp(tags: &HashMap<String, String>) -> DateTime<Utc> {
    tags.get("tmi-sent-ts")
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_message(badges: &[(&str, i32)], time: Option<DateTime<Utc>>) -> RawChatMessage {
        RawChatMessage {
            id: "abc".into(),
            channel: "#SomeChannel".into(),
            user: RawUser {
                id: "42".into(),
                name: "viewer".into(),
                display_name: "Viewer".into(),
                color: "#00FF00".into(),
                badges: badges.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            },
            message: "hi chat".into(),
            bits: 100,
            time,
        }
    }

    #[test]
    fn test_chat_message_translation() {
        let sent = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let msg: ChatMessageEvent = raw_message(&[("moderator", 1), ("subscriber", 6)], Some(sent)).into();

        assert_eq!(msg.id, "abc");
        assert_eq!(msg.channel, "SomeChannel");
        assert_eq!(msg.username, "viewer");
        assert_eq!(msg.display_name, "Viewer");
        assert!(msg.is_moderator);
        assert!(msg.is_subscriber);
        assert_eq!(msg.bits, 100);
        assert_eq!(msg.sent_at, sent);
    }

    #[test]
    fn test_missing_time_defaults_to_now() {
        let before = Utc::now();
        let msg: ChatMessageEvent = raw_message(&[("broadcaster", 1)], None).into();
        assert!(msg.sent_at >= before);
        assert!(msg.is_moderator);
        assert!(!msg.is_subscriber);
    }

    #[test]
    fn test_notice_timestamp_from_tags() {
        let raw = RawNotice {
            channel: " #chan ".into(),
            msg_id: "slow_on".into(),
            message: "slow mode".into(),
            tags: HashMap::from([("tmi-sent-ts".to_string(), "1700000000123".to_string())]),
        };
        let notice: NoticeEvent = raw.into();
        assert_eq!(notice.channel, "chan");
        assert_eq!(notice.notice_at.timestamp_millis(), 1_700_000_000_123);

        let before = Utc::now();
        let raw = RawNotice {
            channel: "chan".into(),
            msg_id: "x".into(),
            message: "y".into(),
            tags: HashMap::from([("tmi-sent-ts".to_string(), "garbage".to_string())]),
        };
        let notice: NoticeEvent = raw.into();
        assert!(notice.notice_at >= before);
    }

    #[test]
    fn test_source_event_json_shape() {
        let line = r##"{"type":"message","id":"1","channel":"#c","user":{"id":"9","name":"n","badges":{"subscriber":1}},"message":"yo"}"##;
        let evt: SourceEvent = serde_json::from_str(line).unwrap();
        match evt {
            SourceEvent::Message(m) => {
                assert_eq!(m.user.badges.get("subscriber"), Some(&1));
                assert_eq!(m.bits, 0);
                assert!(m.time.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }

        let evt: SourceEvent = serde_json::from_str(r#"{"type":"connected"}"#).unwrap();
        assert_eq!(evt, SourceEvent::Connected);
    }
}

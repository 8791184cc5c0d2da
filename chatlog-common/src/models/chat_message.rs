// File: chatlog-common/src/models/chat_message.rs

use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Badge name => badge level, e.g. `subscriber => 12`.
pub type Badges = HashMap<String, i32>;

/// A normalized chat message. `id` is the dedup key used by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub id: String,
    pub channel: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub text: String,
    pub badges: Badges,
    pub color: String,
    pub is_moderator: bool,
    pub is_subscriber: bool,
    pub bits: i32,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessageEvent {
    /// Broadcasters count as moderators.
    pub fn badges_grant_moderator(badges: &Badges) -> bool {
        badge_level(badges, "moderator") > 0 || badge_level(badges, "broadcaster") > 0
    }

    pub fn badges_grant_subscriber(badges: &Badges) -> bool {
        badge_level(badges, "subscriber") > 0
    }
}

fn badge_level(badges: &Badges, name: &str) -> i32 {
    badges.get(name).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_flags() {
        let mut badges = Badges::new();
        assert!(!ChatMessageEvent::badges_grant_moderator(&badges));
        assert!(!ChatMessageEvent::badges_grant_subscriber(&badges));

        badges.insert("broadcaster".into(), 1);
        badges.insert("subscriber".into(), 0);
        assert!(ChatMessageEvent::badges_grant_moderator(&badges));
        assert!(!ChatMessageEvent::badges_grant_subscriber(&badges));

        badges.insert("subscriber".into(), 24);
        assert!(ChatMessageEvent::badges_grant_subscriber(&badges));
    }
}

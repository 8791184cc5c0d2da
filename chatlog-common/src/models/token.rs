// File: chatlog-common/src/models/token.rs

use chrono::{DateTime, Duration, Utc};

/// Tokens closer than this to expiry are treated as absent.
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// An app access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(access: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access: access.into(),
            expires_at,
        }
    }

    /// Usable only while more than the refresh margin remains.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_margin() {
        let now = Utc::now();

        let fresh = Token::new("a", now + Duration::hours(1));
        assert!(fresh.is_usable_at(now));

        let expiring = Token::new("b", now + Duration::minutes(4));
        assert!(!expiring.is_usable_at(now));

        let on_the_edge = Token::new("c", now + Duration::seconds(REFRESH_MARGIN_SECS));
        assert!(!on_the_edge.is_usable_at(now));

        let expired = Token::new("d", now - Duration::minutes(1));
        assert!(!expired.is_usable_at(now));
    }
}

//! Login sessions and the one-shot messages queued on them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A server-side login session, referenced by the `sessionid` cookie.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Severity of a flash message; doubles as its CSS class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Success,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Success => "success",
        }
    }
}

/// A message shown once, on the next page rendered for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashMessage {
    /// One of the [`MessageLevel`] names.
    pub level: String,
    pub body: String,
}

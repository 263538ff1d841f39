//! Represents a registered account.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

/// Longest accepted username, in characters.
pub const USERNAME_MAX_LEN: usize = 150;

/// Longest accepted email address, in characters.
pub const EMAIL_MAX_LEN: usize = 254;

/// Uniqueness key for a username: its Unicode lowercase form, so `Ärger`
/// and `ärger` collide.
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

/// A user row.
///
/// `is_staff` is granted automatically to the very first account and is
/// otherwise only changed by an administrator.
#[derive(Clone, FromRow, Debug)]
pub struct User {
    pub id: i64,

    /// As entered at signup. Uniqueness is enforced on [`username_key`].
    pub username: String,

    pub email: String,

    /// bcrypt hash.
    pub password_hash: String,

    /// Required for every bucket endpoint.
    pub is_staff: bool,

    pub date_joined: DateTime<Utc>,
}

/// Validated signup input. The password is still in clear text here and
/// is hashed by the account service.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

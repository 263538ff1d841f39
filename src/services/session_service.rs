//! Server-side login sessions and flash messages.

use crate::models::{
    session::{FlashMessage, MessageLevel, Session},
    user::User,
};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session lifetime of {0} seconds is out of range")]
    TtlOutOfRange(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Clone)]
pub struct SessionService {
    pub db: Arc<SqlitePool>,
    ttl_secs: i64,
}

/// Joined row for a session lookup.
#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    username: String,
    email: String,
    password_hash: String,
    is_staff: bool,
    date_joined: DateTime<Utc>,
}

impl SessionRow {
    fn split(self) -> (Session, User) {
        let session = Session {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
        };
        let user = User {
            id: self.user_id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_staff: self.is_staff,
            date_joined: self.date_joined,
        };
        (session, user)
    }
}

impl SessionService {
    pub fn new(db: Arc<SqlitePool>, ttl_secs: i64) -> Self {
        Self { db, ttl_secs }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> SessionResult<DateTime<Utc>> {
        TimeDelta::try_seconds(self.ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(SessionError::TtlOutOfRange(self.ttl_secs))
    }

    /// Open a fresh session for `user_id`. Expired sessions of any user are
    /// swept first.
    pub async fn start(&self, user_id: i64) -> SessionResult<Session> {
        let now = Utc::now();
        let expires_at = self.expiry_from(now)?;
        self.purge_expired().await?;

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at,
        };

        sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&*self.db)
            .await?;

        debug!("started session for user {}", user_id);
        Ok(session)
    }

    /// Resolve a session id to the session and its user.
    ///
    /// Unknown ids yield `None`; expired sessions are deleted and also
    /// yield `None`.
    pub async fn resolve(&self, id: Uuid) -> SessionResult<Option<(Session, User)>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT s.id, s.user_id, s.created_at, s.expires_at,
                    u.username, u.email, u.password_hash, u.is_staff, u.date_joined
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;

        let Some((session, user)) = row.map(SessionRow::split) else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            debug!("session for user {} expired", session.user_id);
            self.end(session.id).await?;
            return Ok(None);
        }

        Ok(Some((session, user)))
    }

    /// Delete a session. Its queued messages go with it.
    pub async fn end(&self, id: Uuid) -> SessionResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Remove every session whose expiry has passed.
    pub async fn purge_expired(&self) -> SessionResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&*self.db)
            .await?;
        if result.rows_affected() > 0 {
            debug!("purged {} expired sessions", result.rows_affected());
        }
        Ok(result.rows_affected())
    }

    /// Queue a message for the next page rendered in this session.
    pub async fn push_message(
        &self,
        session_id: Uuid,
        level: MessageLevel,
        body: impl Into<String>,
    ) -> SessionResult<()> {
        sqlx::query(
            "INSERT INTO flash_messages (session_id, level, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(level.as_str())
        .bind(body.into())
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Return the session's queued messages in order and drop them.
    pub async fn take_messages(&self, session_id: Uuid) -> SessionResult<Vec<FlashMessage>> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, level, body FROM flash_messages WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&*self.db)
        .await?;

        let Some(last_id) = rows.last().map(|(id, _, _)| *id) else {
            return Ok(Vec::new());
        };

        sqlx::query("DELETE FROM flash_messages WHERE session_id = ? AND id <= ?")
            .bind(session_id)
            .bind(last_id)
            .execute(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(_, level, body)| FlashMessage { level, body })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn service_and_user(ttl_secs: i64) -> (SessionService, i64) {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, username_key, email, password_hash, is_staff, date_joined)
             VALUES ('alice', 'alice', 'alice@example.com', 'x', 1, ?) RETURNING id",
        )
        .bind(Utc::now())
        .fetch_one(&pool)
        .await
        .unwrap();
        (SessionService::new(Arc::new(pool), ttl_secs), user_id)
    }

    #[tokio::test]
    async fn resolves_live_sessions_and_forgets_ended_ones() {
        let (service, user_id) = service_and_user(3600).await;
        let session = service.start(user_id).await.unwrap();

        let (found, user) = service.resolve(session.id).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(user.username, "alice");
        assert!(user.is_staff);

        service.end(session.id).await.unwrap();
        assert!(service.resolve(session.id).await.unwrap().is_none());
        assert!(service.resolve(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let (service, user_id) = service_and_user(0).await;
        let session = service.start(user_id).await.unwrap();
        assert!(service.resolve(session.id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&*service.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn unrepresentable_lifetimes_fail_to_start() {
        for ttl_secs in [10_000_000_000_000, i64::MAX, i64::MIN] {
            let (service, user_id) = service_and_user(ttl_secs).await;
            let err = service.start(user_id).await.unwrap_err();
            assert!(matches!(err, SessionError::TtlOutOfRange(secs) if secs == ttl_secs));

            let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
                .fetch_one(&*service.db)
                .await
                .unwrap();
            assert_eq!(stored, 0);
        }
    }

    #[tokio::test]
    async fn messages_are_delivered_once() {
        let (service, user_id) = service_and_user(3600).await;
        let session = service.start(user_id).await.unwrap();

        service
            .push_message(session.id, MessageLevel::Success, "first")
            .await
            .unwrap();
        service
            .push_message(session.id, MessageLevel::Success, "second")
            .await
            .unwrap();

        let messages = service.take_messages(session.id).await.unwrap();
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(messages[0].level, "success");

        assert!(service.take_messages(session.id).await.unwrap().is_empty());
    }
}

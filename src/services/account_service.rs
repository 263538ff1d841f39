//! src/services/account_service.rs
//!
//! AccountService: user registration, credential checks and the
//! administrative mutations (staff flag, deletion).

use crate::{
    models::user::{NewUser, User, username_key},
    services::bucket_service::is_unique_violation,
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    PasswordHash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AccountResult<T> = Result<T, AccountError>;

#[derive(Clone)]
pub struct AccountService {
    pub db: Arc<SqlitePool>,
    hash_cost: u32,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, date_joined";

impl AccountService {
    pub fn new(db: Arc<SqlitePool>, hash_cost: u32) -> Self {
        Self { db, hash_cost }
    }

    /// Whether a username is taken, ignoring case (Unicode-aware).
    pub async fn username_exists(&self, username: &str) -> AccountResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username_key = ?)",
        )
        .bind(username_key(username))
        .fetch_one(&*self.db)
        .await?;
        Ok(exists)
    }

    /// Register a new user.
    ///
    /// The account is made staff iff no other user existed at insert time.
    /// That decision is part of the INSERT statement itself, so two racing
    /// signups cannot both become staff.
    pub async fn signup(&self, new_user: NewUser) -> AccountResult<User> {
        if self.username_exists(&new_user.username).await? {
            return Err(AccountError::UsernameTaken(new_user.username));
        }

        let password_hash = self.hash_password(new_user.password.clone()).await?;

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, username_key, email, password_hash, is_staff, date_joined)
             SELECT ?, ?, ?, ?, NOT EXISTS(SELECT 1 FROM users), ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(username_key(&new_user.username))
        .bind(&new_user.email)
        .bind(&password_hash)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(user) => {
                info!(
                    "registered user {} (id {}, staff: {})",
                    user.username, user.id, user.is_staff
                );
                Ok(user)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(AccountError::UsernameTaken(new_user.username))
            }
            Err(err) => Err(AccountError::Sqlx(err)),
        }
    }

    /// Check a username/password pair. The username match is case-sensitive.
    pub async fn authenticate(&self, username: &str, password: &str) -> AccountResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;

        if matches {
            debug!("credentials accepted for user {}", user.id);
            Ok(user)
        } else {
            Err(AccountError::InvalidCredentials)
        }
    }

    pub async fn find_by_username(&self, username: &str) -> AccountResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username_key = ?"
        ))
        .bind(username_key(username))
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| AccountError::UserNotFound(username.to_string()))
    }

    /// Grant or revoke staff privileges.
    pub async fn set_staff(&self, username: &str, is_staff: bool) -> AccountResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_staff = ? WHERE username_key = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(is_staff)
        .bind(username_key(username))
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| AccountError::UserNotFound(username.to_string()))?;

        info!("set staff={} for user {}", is_staff, user.username);
        Ok(user)
    }

    /// Delete a user. Buckets, sessions and queued messages cascade.
    pub async fn delete(&self, username: &str) -> AccountResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE username_key = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(username_key(username))
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| AccountError::UserNotFound(username.to_string()))?;

        info!("deleted user {} (id {})", user.username, user.id);
        Ok(user)
    }

    async fn hash_password(&self, password: String) -> AccountResult<String> {
        let cost = self.hash_cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }
}

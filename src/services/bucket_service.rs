//! src/services/bucket_service.rs
//!
//! BucketService: owner-scoped CRUD over the `buckets` table. Every query
//! carries `owner_id` in its WHERE clause, so a bucket that belongs to
//! somebody else is indistinguishable from one that does not exist.

use crate::models::{
    bucket::{BUCKET_NAME_MAX_LEN, Bucket, BucketInput},
    page::{Page, PageError, PageRequest, PageWindow},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Buckets shown per listing page.
pub const BUCKETS_PER_PAGE: u64 = 10;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("bucket {0} not found")]
    NotFound(i64),
    #[error("bucket `{0}` already exists for this owner")]
    DuplicateName(String),
    #[error("bucket name invalid: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type BucketResult<T> = Result<T, BucketError>;

/// BucketService provides the bucket operations behind the dashboard:
/// - List a page of the owner's buckets, newest first
/// - Create a bucket for an owner
/// - Fetch, update and delete a bucket the owner holds
#[derive(Clone)]
pub struct BucketService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

const BUCKET_COLUMNS: &str = "id, name, description, created_at, owner_id";

impl BucketService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Validate a bucket name before it reaches the database.
    ///
    /// Forms already enforce this; the service re-checks so that every
    /// caller gets the same guarantees.
    fn ensure_name_valid(&self, name: &str) -> BucketResult<()> {
        if name.trim().is_empty() {
            return Err(BucketError::InvalidName("name is required".into()));
        }
        let len = name.chars().count();
        if len > BUCKET_NAME_MAX_LEN {
            return Err(BucketError::InvalidName(format!(
                "must be at most {} characters (it has {})",
                BUCKET_NAME_MAX_LEN, len
            )));
        }
        Ok(())
    }

    /// Whether `owner_id` already has a bucket called `name`, ignoring the
    /// bucket `except` (the one being edited).
    pub async fn name_taken(
        &self,
        owner_id: i64,
        name: &str,
        except: Option<i64>,
    ) -> BucketResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM buckets
                 WHERE owner_id = ? AND name = ? AND id IS NOT ?
             )",
        )
        .bind(owner_id)
        .bind(name)
        .bind(except)
        .fetch_one(&*self.db)
        .await?;
        Ok(exists)
    }

    /// List one page of the owner's buckets, newest first.
    ///
    /// Returns `Page` errors for a non-existent page number; page 1 of an
    /// empty listing is valid.
    pub async fn list_for_owner(
        &self,
        owner_id: i64,
        request: PageRequest,
    ) -> BucketResult<Page<Bucket>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buckets WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&*self.db)
            .await?;

        let window = PageWindow::resolve(request, total.max(0) as u64, BUCKETS_PER_PAGE)?;

        let items = sqlx::query_as::<_, Bucket>(&format!(
            "SELECT {BUCKET_COLUMNS} FROM buckets
             WHERE owner_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(owner_id)
        .bind(window.per_page as i64)
        .bind(window.offset() as i64)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page { items, window })
    }

    /// Fetch a bucket only if `owner_id` owns it.
    pub async fn get_owned(&self, owner_id: i64, id: i64) -> BucketResult<Bucket> {
        sqlx::query_as::<_, Bucket>(&format!(
            "SELECT {BUCKET_COLUMNS} FROM buckets WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BucketError::NotFound(id),
            other => BucketError::Sqlx(other),
        })
    }

    /// Create a bucket owned by `owner_id`.
    ///
    /// Returns DuplicateName when the owner already has a bucket with the
    /// same name; the UNIQUE constraint backs this up under concurrency.
    pub async fn create(&self, owner_id: i64, input: BucketInput) -> BucketResult<Bucket> {
        self.ensure_name_valid(&input.name)?;

        let result = sqlx::query_as::<_, Bucket>(&format!(
            "INSERT INTO buckets (name, description, created_at, owner_id)
             VALUES (?, ?, ?, ?)
             RETURNING {BUCKET_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .bind(owner_id)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(bucket) => {
                debug!("created bucket {} for owner {}", bucket.id, owner_id);
                Ok(bucket)
            }
            Err(err) if is_unique_violation(&err) => Err(BucketError::DuplicateName(input.name)),
            Err(err) => Err(BucketError::Sqlx(err)),
        }
    }

    /// Rename and/or re-describe an owned bucket. `created_at` is untouched.
    pub async fn update(
        &self,
        owner_id: i64,
        id: i64,
        input: BucketInput,
    ) -> BucketResult<Bucket> {
        self.ensure_name_valid(&input.name)?;

        let result = sqlx::query_as::<_, Bucket>(&format!(
            "UPDATE buckets SET name = ?, description = ?
             WHERE id = ? AND owner_id = ?
             RETURNING {BUCKET_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&*self.db)
        .await;

        match result {
            Ok(Some(bucket)) => Ok(bucket),
            Ok(None) => Err(BucketError::NotFound(id)),
            Err(err) if is_unique_violation(&err) => Err(BucketError::DuplicateName(input.name)),
            Err(err) => Err(BucketError::Sqlx(err)),
        }
    }

    /// Delete an owned bucket and return the removed row.
    pub async fn delete(&self, owner_id: i64, id: i64) -> BucketResult<Bucket> {
        sqlx::query_as::<_, Bucket>(&format!(
            "DELETE FROM buckets WHERE id = ? AND owner_id = ? RETURNING {BUCKET_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(BucketError::NotFound(id))
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn service_with_owners() -> (BucketService, i64, i64) {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let mut ids = Vec::new();
        for username in ["alice", "bob"] {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO users (username, username_key, email, password_hash, is_staff, date_joined)
                 VALUES (?, ?, ?, 'x', 1, ?) RETURNING id",
            )
            .bind(username)
            .bind(username)
            .bind(format!("{}@example.com", username))
            .bind(Utc::now())
            .fetch_one(&pool)
            .await
            .unwrap();
            ids.push(id);
        }
        (BucketService::new(Arc::new(pool)), ids[0], ids[1])
    }

    fn input(name: &str) -> BucketInput {
        BucketInput {
            name: name.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn names_are_unique_per_owner_only() {
        let (service, alice, bob) = service_with_owners().await;

        service.create(alice, input("Photos")).await.unwrap();
        let err = service.create(alice, input("Photos")).await.unwrap_err();
        assert!(matches!(err, BucketError::DuplicateName(name) if name == "Photos"));

        // Another owner may reuse the name.
        service.create(bob, input("Photos")).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buckets WHERE name = 'Photos'")
            .fetch_one(&*service.db)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn foreign_buckets_are_not_found() {
        let (service, alice, bob) = service_with_owners().await;
        let bucket = service.create(alice, input("Private")).await.unwrap();

        assert!(matches!(
            service.get_owned(bob, bucket.id).await,
            Err(BucketError::NotFound(_))
        ));
        assert!(matches!(
            service.update(bob, bucket.id, input("Stolen")).await,
            Err(BucketError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(bob, bucket.id).await,
            Err(BucketError::NotFound(_))
        ));

        let still_there = service.get_owned(alice, bucket.id).await.unwrap();
        assert_eq!(still_there.name, "Private");
    }

    #[tokio::test]
    async fn update_keeps_created_at_and_checks_uniqueness() {
        let (service, alice, _) = service_with_owners().await;
        let first = service.create(alice, input("First")).await.unwrap();
        service.create(alice, input("Second")).await.unwrap();

        let renamed = service
            .update(
                alice,
                first.id,
                BucketInput {
                    name: "Renamed".into(),
                    description: "now described".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.created_at, first.created_at);
        assert_eq!(renamed.description, "now described");

        let err = service
            .update(alice, first.id, input("Second"))
            .await
            .unwrap_err();
        assert!(matches!(err, BucketError::DuplicateName(_)));

        assert!(!service.name_taken(alice, "Renamed", Some(first.id)).await.unwrap());
        assert!(service.name_taken(alice, "Renamed", None).await.unwrap());
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let (service, alice, bob) = service_with_owners().await;
        for i in 0..12 {
            service.create(alice, input(&format!("b{:02}", i))).await.unwrap();
        }
        service.create(bob, input("not-alice")).await.unwrap();

        let first = service
            .list_for_owner(alice, PageRequest::Number(1))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.window.total, 12);
        assert_eq!(first.window.num_pages, 2);
        assert_eq!(first.items[0].name, "b11");

        let last = service.list_for_owner(alice, PageRequest::Last).await.unwrap();
        let names: Vec<_> = last.items.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["b01", "b00"]);

        assert!(matches!(
            service.list_for_owner(alice, PageRequest::Number(3)).await,
            Err(BucketError::Page(PageError::OutOfRange(3)))
        ));
    }

    #[tokio::test]
    async fn rejects_overlong_names() {
        let (service, alice, _) = service_with_owners().await;
        let err = service
            .create(alice, input(&"x".repeat(BUCKET_NAME_MAX_LEN + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BucketError::InvalidName(_)));

        service
            .create(alice, input(&"x".repeat(BUCKET_NAME_MAX_LEN)))
            .await
            .unwrap();
    }
}

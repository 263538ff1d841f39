//! Represents a bucket, a named record owned by exactly one user.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Longest accepted bucket name, in characters.
pub const BUCKET_NAME_MAX_LEN: usize = 150;

/// A bucket row.
///
/// `(name, owner_id)` is unique; different owners may reuse a name.
/// Listings are ordered newest first.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// Integer primary key, used in `/buckets/{id}/...` paths.
    pub id: i64,

    /// Display name, unique per owner.
    pub name: String,

    /// Free-form description; empty when not provided.
    pub description: String,

    /// Set once at insert time and never updated.
    pub created_at: DateTime<Utc>,

    /// ID of the owning user. Deleting the user deletes the bucket.
    pub owner_id: i64,
}

impl Bucket {
    /// Human readable label, e.g. `Photos (alice)`.
    pub fn label(&self, owner_username: &str) -> String {
        format!("{} ({})", self.name, owner_username)
    }
}

/// Validated input for creating or editing a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInput {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_owner() {
        let bucket = Bucket {
            id: 1,
            name: "Test Bucket".into(),
            description: "Test description".into(),
            created_at: Utc::now(),
            owner_id: 7,
        };
        assert_eq!(bucket.label("testuser"), "Test Bucket (testuser)");
    }
}

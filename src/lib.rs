//! Bucket manager: a small server-rendered web app where staff users keep
//! a private list of named storage buckets.

pub mod config;
pub mod db;
pub mod errors;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod templates;

use config::AppConfig;
use services::{
    account_service::AccountService, bucket_service::BucketService,
    session_service::SessionService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub buckets: BucketService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, config: AppConfig) -> Self {
        Self {
            accounts: AccountService::new(db.clone(), config.password_hash_cost),
            sessions: SessionService::new(db.clone(), config.session_ttl_secs),
            buckets: BucketService::new(db),
            config: Arc::new(config),
        }
    }
}

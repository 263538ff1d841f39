//! Route table.
//!
//! ## Structure
//! - **Probes**: `GET /healthz`, `GET /readyz`
//! - **Accounts**
//!   - `GET /`: landing page
//!   - `GET|POST /accounts/signup/`, `/accounts/login/`, `/accounts/logout/`
//! - **Buckets**, mounted under both `/buckets` and `/dashboard`
//!   - `GET      {prefix}/`: list own buckets (`?page=N|last`)
//!   - `GET|POST {prefix}/create/`
//!   - `GET|POST {prefix}/{id}/edit/`
//!   - `GET|POST {prefix}/{id}/delete/`

use crate::{
    AppState,
    handlers::{
        account_handlers::{home, login, login_form, logout, signup, signup_form},
        bucket_handlers::{
            create_bucket, create_bucket_form, delete_bucket, delete_bucket_form, edit_bucket,
            edit_bucket_form, list_buckets,
        },
        health_handlers::{healthz, readyz},
    },
};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Build the router for every page. State is supplied by [`app`].
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/", get(home))
        .route("/accounts/signup/", get(signup_form).post(signup))
        .route("/accounts/login/", get(login_form).post(login))
        .route("/accounts/logout/", get(logout).post(logout))
        .merge(bucket_routes("/buckets"))
        .merge(bucket_routes("/dashboard"))
}

/// The bucket pages under one path prefix.
fn bucket_routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/"), get(list_buckets))
        .route(
            &format!("{prefix}/create/"),
            get(create_bucket_form).post(create_bucket),
        )
        .route(
            &format!("{prefix}/{{id}}/edit/"),
            get(edit_bucket_form).post(edit_bucket),
        )
        .route(
            &format!("{prefix}/{{id}}/delete/"),
            get(delete_bucket_form).post(delete_bucket),
        )
}

/// The complete application with request tracing and state attached.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Shared harness for the HTTP integration tests.
//!
//! Each test gets its own in-memory database and drives the real router
//! through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use bucket_manager::{AppState, config::AppConfig, db, routes};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cure-passphrase";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

pub async fn test_app() -> TestApp {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");

    let config = AppConfig {
        // Minimum bcrypt cost keeps the suite fast.
        password_hash_cost: 4,
        ..AppConfig::default()
    };
    let state = AppState::new(Arc::new(pool), config);
    TestApp {
        app: routes::routes::app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    /// Sign up `username` and return the `sessionid=...` cookie pair.
    pub async fn signup(&self, username: &str) -> String {
        let email = format!("{}@example.com", username);
        let response = self
            .post_form(
                "/accounts/signup/",
                &[
                    ("username", username),
                    ("email", email.as_str()),
                    ("password1", PASSWORD),
                    ("password2", PASSWORD),
                ],
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::FOUND, "signup of {}", username);
        session_cookie(&response).expect("signup sets the session cookie")
    }

    /// Sign up `username` and make sure the account is staff.
    pub async fn staff(&self, username: &str) -> String {
        let cookie = self.signup(username).await;
        self.state
            .accounts
            .set_staff(username, true)
            .await
            .expect("grant staff");
        cookie
    }

    pub async fn user_id(&self, username: &str) -> i64 {
        self.state
            .accounts
            .find_by_username(username)
            .await
            .expect("user exists")
            .id
    }

    pub async fn user_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&*self.state.accounts.db)
            .await
            .unwrap()
    }

    pub async fn bucket_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM buckets")
            .fetch_one(&*self.state.buckets.db)
            .await
            .unwrap()
    }
}

/// The `sessionid=<value>` pair from a response's `Set-Cookie`, if any.
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with("sessionid="))
        .map(str::to_string)
}

pub fn location<B>(response: &Response<B>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

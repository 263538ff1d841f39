use crate::{
    models::page::PageError,
    services::{
        account_service::AccountError, bucket_service::BucketError,
        session_service::SessionError,
    },
    templates::ErrorPage,
};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
///
/// Rendered as an HTML error page. Messages of 5xx errors are logged and
/// never shown to the client.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 403 Forbidden; no detail is given to the client.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!("{} {}", self.status, self.message);
            String::new()
        } else {
            self.message
        };

        let page = ErrorPage {
            status: self.status.as_u16(),
            reason: self.status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        };

        match page.render() {
            Ok(body) => (self.status, Html(body)).into_response(),
            Err(err) => {
                tracing::error!("failed to render error page: {}", err);
                (self.status, self.status.to_string()).into_response()
            }
        }
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        AppError::not_found(err.to_string())
    }
}

impl From<BucketError> for AppError {
    fn from(err: BucketError) -> Self {
        match err {
            BucketError::NotFound(_) => AppError::not_found("No bucket found matching the query"),
            BucketError::Page(page) => page.into(),
            BucketError::DuplicateName(_) | BucketError::InvalidName(_) => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            BucketError::Sqlx(err) => AppError::internal(format!("database error: {}", err)),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound(_) => AppError::not_found(err.to_string()),
            AccountError::UsernameTaken(_) => AppError::new(StatusCode::CONFLICT, err.to_string()),
            AccountError::InvalidCredentials => {
                AppError::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AccountError::PasswordHash(_) | AccountError::TaskJoin(_) | AccountError::Sqlx(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::internal(err.to_string())
    }
}

//! Request guards, expressed as extractors.
//!
//! - [`Visitor`] resolves the `sessionid` cookie to a session and user, or
//!   to nobody.
//! - [`StaffUser`] requires a signed-in staff user: anonymous requests are
//!   redirected to the login page with `next` set, signed-in non-staff users
//!   get a 403.
//!
//! Handlers compose these by listing them first in their arguments.

use crate::{
    AppState,
    config::AppConfig,
    errors::AppError,
    handlers::redirect_found,
    models::{session::Session, user::User},
    templates::PageContext,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sessionid";

pub const LOGIN_PATH: &str = "/accounts/login/";

/// Whoever sent the request: a signed-in user or an anonymous visitor.
#[derive(Debug, Clone, Default)]
pub struct Visitor {
    pub session: Option<Session>,
    pub user: Option<User>,
}

impl Visitor {
    /// Layout context for this visitor, consuming any queued messages.
    pub async fn page_context(&self, state: &AppState) -> Result<PageContext, AppError> {
        let messages = match &self.session {
            Some(session) => state.sessions.take_messages(session.id).await?,
            None => Vec::new(),
        };
        Ok(PageContext::new(self.user.as_ref(), messages))
    }
}

impl<S> FromRequestParts<S> for Visitor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(session_id) = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
        else {
            return Ok(Visitor::default());
        };

        Ok(match state.sessions.resolve(session_id).await? {
            Some((session, user)) => Visitor {
                session: Some(session),
                user: Some(user),
            },
            None => Visitor::default(),
        })
    }
}

/// A signed-in user with the staff flag set.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user: User,
    pub session: Session,
}

impl StaffUser {
    pub async fn page_context(&self, state: &AppState) -> Result<PageContext, AppError> {
        let messages = state.sessions.take_messages(self.session.id).await?;
        Ok(PageContext::new(Some(&self.user), messages))
    }
}

impl<S> FromRequestParts<S> for StaffUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let visitor = Visitor::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match (visitor.session, visitor.user) {
            (Some(session), Some(user)) if user.is_staff => Ok(StaffUser { user, session }),
            (Some(_), Some(user)) => {
                tracing::warn!(
                    "user {} without staff privileges denied {}",
                    user.username,
                    parts.uri.path()
                );
                Err(AppError::forbidden().into_response())
            }
            _ => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(redirect_found(&login_url(next)))
            }
        }
    }
}

/// `/accounts/login/?next=...`, keeping `/` readable in the target.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_PATH, encoded.replace("%2F", "/"))
}

/// The session cookie handed out at login and signup.
pub fn session_cookie(session: &Session, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .build()
}

/// A cookie that clears the session cookie on the client.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

//! Account pages: home, signup, login and logout.

use crate::{
    AppState,
    errors::AppError,
    forms::{FormErrors, INVALID_LOGIN, LoginForm, SignupForm, USERNAME_TAKEN, safe_next},
    handlers::{
        guards::{Visitor, removal_cookie, session_cookie},
        redirect_found,
    },
    models::{session::MessageLevel, user::User},
    services::account_service::AccountError,
    templates::{HomePage, LoginPage, SignupPage, render},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

const FIRST_USER_WELCOME: &str =
    "Welcome! You are the first user and have been granted staff privileges.";
const ACCOUNT_CREATED: &str = "Account created successfully!";
const WELCOME_BACK: &str = "Welcome back!";

/// Where signup lands.
const SIGNUP_REDIRECT: &str = "/dashboard/";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// `GET /`
pub async fn home(State(state): State<AppState>, visitor: Visitor) -> Result<Response, AppError> {
    let ctx = visitor.page_context(&state).await?;
    Ok(render(&HomePage { ctx })?.into_response())
}

/// `GET /accounts/signup/`
pub async fn signup_form(
    State(state): State<AppState>,
    visitor: Visitor,
) -> Result<Response, AppError> {
    let ctx = visitor.page_context(&state).await?;
    let page = SignupPage::new(ctx, "", "", &FormErrors::default());
    Ok(render(&page)?.into_response())
}

/// `POST /accounts/signup/`
///
/// Creates the account and signs it in. The very first account becomes
/// staff.
pub async fn signup(
    State(state): State<AppState>,
    visitor: Visitor,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let new_user = match form.validate() {
        Ok(new_user) => new_user,
        Err(errors) => return signup_page(&state, &visitor, &form, &errors).await,
    };

    let user = match state.accounts.signup(new_user).await {
        Ok(user) => user,
        Err(AccountError::UsernameTaken(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", USERNAME_TAKEN);
            return signup_page(&state, &visitor, &form, &errors).await;
        }
        Err(err) => return Err(err.into()),
    };

    let greeting = if user.is_staff {
        FIRST_USER_WELCOME
    } else {
        ACCOUNT_CREATED
    };
    sign_in(&state, &visitor, jar, &user, greeting, SIGNUP_REDIRECT).await
}

async fn signup_page(
    state: &AppState,
    visitor: &Visitor,
    form: &SignupForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let ctx = visitor.page_context(state).await?;
    let page = SignupPage::new(ctx, form.username.trim(), form.email.trim(), errors);
    Ok(render(&page)?.into_response())
}

/// `GET /accounts/login/`
pub async fn login_form(
    State(state): State<AppState>,
    visitor: Visitor,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    let ctx = visitor.page_context(&state).await?;
    let next = query.next.unwrap_or_default();
    let page = LoginPage::new(ctx, "", &next, &FormErrors::default());
    Ok(render(&page)?.into_response())
}

/// `POST /accounts/login/`
pub async fn login(
    State(state): State<AppState>,
    visitor: Visitor,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return login_page(&state, &visitor, &form, &errors).await,
    };

    let user = match state.accounts.authenticate(&username, &password).await {
        Ok(user) => user,
        Err(AccountError::InvalidCredentials) => {
            warn!("failed login for username {:?}", username);
            let mut errors = FormErrors::default();
            errors.add_non_field(INVALID_LOGIN);
            return login_page(&state, &visitor, &form, &errors).await;
        }
        Err(err) => return Err(err.into()),
    };

    let target = safe_next(form.next.as_deref())
        .unwrap_or(state.config.login_redirect_url.as_str())
        .to_string();
    sign_in(&state, &visitor, jar, &user, WELCOME_BACK, &target).await
}

async fn login_page(
    state: &AppState,
    visitor: &Visitor,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let ctx = visitor.page_context(state).await?;
    let next = form.next.as_deref().unwrap_or_default();
    let page = LoginPage::new(ctx, form.username.trim(), next, errors);
    Ok(render(&page)?.into_response())
}

/// Replace any current session with a fresh one for `user`, queue
/// `greeting` on it and redirect to `target`.
async fn sign_in(
    state: &AppState,
    visitor: &Visitor,
    jar: CookieJar,
    user: &User,
    greeting: &str,
    target: &str,
) -> Result<Response, AppError> {
    if let Some(previous) = &visitor.session {
        state.sessions.end(previous.id).await?;
    }

    let session = state.sessions.start(user.id).await?;
    state
        .sessions
        .push_message(session.id, MessageLevel::Success, greeting)
        .await?;
    info!("user {} signed in", user.username);

    let jar = jar.add(session_cookie(&session, &state.config));
    Ok((jar, redirect_found(target)).into_response())
}

/// `GET|POST /accounts/logout/`
pub async fn logout(
    State(state): State<AppState>,
    visitor: Visitor,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(session) = &visitor.session {
        state.sessions.end(session.id).await?;
    }
    if let Some(user) = &visitor.user {
        info!("user {} signed out", user.username);
    }

    let jar = jar.remove(removal_cookie());
    Ok((jar, redirect_found(&state.config.logout_redirect_url)).into_response())
}

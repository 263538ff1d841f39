//! Askama page templates.
//!
//! Every page extends `base.html`, which reads the shared [`PageContext`]
//! through the `ctx` field.

use crate::{
    errors::AppError,
    forms::FormErrors,
    models::{bucket::Bucket, page::PageWindow, session::FlashMessage, user::User},
};
use askama::Template;
use axum::response::Html;

/// Navigation state and pending messages shown by the layout.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub signed_in: bool,
    pub username: String,
    pub is_staff: bool,
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    pub fn new(user: Option<&User>, messages: Vec<FlashMessage>) -> Self {
        Self {
            signed_in: user.is_some(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            is_staff: user.is_some_and(|u| u.is_staff),
            messages,
        }
    }
}

/// Render a template into an HTML response body.
pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|err| AppError::internal(format!("template error: {}", err)))
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "accounts/signup.html")]
pub struct SignupPage {
    pub ctx: PageContext,
    pub username: String,
    pub email: String,
    pub username_errors: Vec<String>,
    pub email_errors: Vec<String>,
    pub password1_errors: Vec<String>,
    pub password2_errors: Vec<String>,
}

impl SignupPage {
    pub fn new(ctx: PageContext, username: &str, email: &str, errors: &FormErrors) -> Self {
        Self {
            ctx,
            username: username.to_string(),
            email: email.to_string(),
            username_errors: errors.field("username"),
            email_errors: errors.field("email"),
            password1_errors: errors.field("password1"),
            password2_errors: errors.field("password2"),
        }
    }
}

#[derive(Template)]
#[template(path = "accounts/login.html")]
pub struct LoginPage {
    pub ctx: PageContext,
    pub username: String,
    pub next: String,
    pub username_errors: Vec<String>,
    pub password_errors: Vec<String>,
    pub non_field_errors: Vec<String>,
}

impl LoginPage {
    pub fn new(ctx: PageContext, username: &str, next: &str, errors: &FormErrors) -> Self {
        Self {
            ctx,
            username: username.to_string(),
            next: next.to_string(),
            username_errors: errors.field("username"),
            password_errors: errors.field("password"),
            non_field_errors: errors.non_field(),
        }
    }
}

/// One row of the bucket table.
#[derive(Debug, Clone)]
pub struct BucketRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl From<&Bucket> for BucketRow {
    fn from(bucket: &Bucket) -> Self {
        Self {
            id: bucket.id,
            name: bucket.name.clone(),
            description: bucket.description.clone(),
            created_at: bucket.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "buckets/list.html")]
pub struct BucketListPage {
    pub ctx: PageContext,
    pub buckets: Vec<BucketRow>,
    pub window: PageWindow,
}

#[derive(Template)]
#[template(path = "buckets/form.html")]
pub struct BucketFormPage {
    pub ctx: PageContext,
    pub title: &'static str,
    pub submit_text: &'static str,
    pub action: String,
    pub name: String,
    pub description: String,
    pub name_errors: Vec<String>,
    pub description_errors: Vec<String>,
    pub non_field_errors: Vec<String>,
}

impl BucketFormPage {
    pub fn create(ctx: PageContext, name: &str, description: &str, errors: &FormErrors) -> Self {
        Self::build(
            ctx,
            "Create Bucket",
            "Create Bucket",
            "/buckets/create/".into(),
            name,
            description,
            errors,
        )
    }

    pub fn edit(
        ctx: PageContext,
        id: i64,
        name: &str,
        description: &str,
        errors: &FormErrors,
    ) -> Self {
        Self::build(
            ctx,
            "Edit Bucket",
            "Update Bucket",
            format!("/buckets/{}/edit/", id),
            name,
            description,
            errors,
        )
    }

    fn build(
        ctx: PageContext,
        title: &'static str,
        submit_text: &'static str,
        action: String,
        name: &str,
        description: &str,
        errors: &FormErrors,
    ) -> Self {
        Self {
            ctx,
            title,
            submit_text,
            action,
            name: name.to_string(),
            description: description.to_string(),
            name_errors: errors.field("name"),
            description_errors: errors.field("description"),
            non_field_errors: errors.non_field(),
        }
    }
}

#[derive(Template)]
#[template(path = "buckets/confirm_delete.html")]
pub struct BucketDeletePage {
    pub ctx: PageContext,
    pub bucket: BucketRow,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status: u16,
    pub reason: String,
    pub message: String,
}

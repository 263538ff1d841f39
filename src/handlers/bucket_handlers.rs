//! Staff-only bucket pages.
//!
//! Every handler takes [`StaffUser`] first, so the login redirect or 403
//! happens before the path is parsed or any bucket is looked up. All
//! lookups are scoped to the signed-in owner; someone else's bucket is
//! indistinguishable from a missing one.

use crate::{
    AppState,
    errors::AppError,
    forms::{BucketForm, DUPLICATE_BUCKET, FormErrors},
    handlers::{guards::StaffUser, redirect_found},
    models::{bucket::Bucket, page::PageRequest, session::MessageLevel},
    services::bucket_service::BucketError,
    templates::{BucketDeletePage, BucketFormPage, BucketListPage, BucketRow, render},
};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

/// Where every successful bucket mutation lands.
const BUCKET_LIST_URL: &str = "/buckets/";

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

/// Path ids that are not integers cannot name a bucket.
fn parse_bucket_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::not_found("No bucket found matching the query"))
}

/// `GET /buckets/` (also `/dashboard/`)
pub async fn list_buckets(
    staff: StaffUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let request = PageRequest::parse(query.page.as_deref())?;
    let page = state.buckets.list_for_owner(staff.user.id, request).await?;

    let ctx = staff.page_context(&state).await?;
    let listing = BucketListPage {
        ctx,
        buckets: page.items.iter().map(BucketRow::from).collect(),
        window: page.window,
    };
    Ok(render(&listing)?.into_response())
}

/// `GET /buckets/create/`
pub async fn create_bucket_form(
    staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let ctx = staff.page_context(&state).await?;
    let page = BucketFormPage::create(ctx, "", "", &FormErrors::default());
    Ok(render(&page)?.into_response())
}

/// `POST /buckets/create/`
pub async fn create_bucket(
    staff: StaffUser,
    State(state): State<AppState>,
    Form(form): Form<BucketForm>,
) -> Result<Response, AppError> {
    let owner_id = staff.user.id;
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return create_page(&state, &staff, &form, &errors).await,
    };

    if state.buckets.name_taken(owner_id, &input.name, None).await? {
        return create_page(&state, &staff, &form, &duplicate_name()).await;
    }

    let bucket = match state.buckets.create(owner_id, input).await {
        Ok(bucket) => bucket,
        Err(BucketError::DuplicateName(_)) => {
            return create_page(&state, &staff, &form, &duplicate_name()).await;
        }
        Err(err) => return Err(err.into()),
    };

    info!("created bucket {}", bucket.label(&staff.user.username));
    finish(&state, &staff, &bucket, "created").await
}

async fn create_page(
    state: &AppState,
    staff: &StaffUser,
    form: &BucketForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let ctx = staff.page_context(state).await?;
    let page = BucketFormPage::create(ctx, &form.name, &form.description, errors);
    Ok(render(&page)?.into_response())
}

/// `GET /buckets/{id}/edit/`
pub async fn edit_bucket_form(
    staff: StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_bucket_id(&id)?;
    let bucket = state.buckets.get_owned(staff.user.id, id).await?;

    let ctx = staff.page_context(&state).await?;
    let page = BucketFormPage::edit(
        ctx,
        bucket.id,
        &bucket.name,
        &bucket.description,
        &FormErrors::default(),
    );
    Ok(render(&page)?.into_response())
}

/// `POST /buckets/{id}/edit/`
pub async fn edit_bucket(
    staff: StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<BucketForm>,
) -> Result<Response, AppError> {
    let id = parse_bucket_id(&id)?;
    let owner_id = staff.user.id;
    // 404 for foreign buckets even when the submitted form is invalid.
    state.buckets.get_owned(owner_id, id).await?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return edit_page(&state, &staff, id, &form, &errors).await,
    };

    if state.buckets.name_taken(owner_id, &input.name, Some(id)).await? {
        return edit_page(&state, &staff, id, &form, &duplicate_name()).await;
    }

    let bucket = match state.buckets.update(owner_id, id, input).await {
        Ok(bucket) => bucket,
        Err(BucketError::DuplicateName(_)) => {
            return edit_page(&state, &staff, id, &form, &duplicate_name()).await;
        }
        Err(err) => return Err(err.into()),
    };

    info!("updated bucket {}", bucket.label(&staff.user.username));
    finish(&state, &staff, &bucket, "updated").await
}

async fn edit_page(
    state: &AppState,
    staff: &StaffUser,
    id: i64,
    form: &BucketForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let ctx = staff.page_context(state).await?;
    let page = BucketFormPage::edit(ctx, id, &form.name, &form.description, errors);
    Ok(render(&page)?.into_response())
}

/// `GET /buckets/{id}/delete/`: confirmation page.
pub async fn delete_bucket_form(
    staff: StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_bucket_id(&id)?;
    let bucket = state.buckets.get_owned(staff.user.id, id).await?;

    let ctx = staff.page_context(&state).await?;
    let page = BucketDeletePage {
        ctx,
        bucket: BucketRow::from(&bucket),
    };
    Ok(render(&page)?.into_response())
}

/// `POST /buckets/{id}/delete/`
pub async fn delete_bucket(
    staff: StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_bucket_id(&id)?;
    let bucket = state.buckets.delete(staff.user.id, id).await?;

    info!("deleted bucket {}", bucket.label(&staff.user.username));
    finish(&state, &staff, &bucket, "deleted").await
}

fn duplicate_name() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add("name", DUPLICATE_BUCKET);
    errors
}

/// Queue the success message for `verb` and go back to the list.
async fn finish(
    state: &AppState,
    staff: &StaffUser,
    bucket: &Bucket,
    verb: &str,
) -> Result<Response, AppError> {
    state
        .sessions
        .push_message(
            staff.session.id,
            MessageLevel::Success,
            format!("Bucket \"{}\" {} successfully!", bucket.name, verb),
        )
        .await?;
    Ok(redirect_found(BUCKET_LIST_URL))
}

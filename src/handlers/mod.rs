pub mod account_handlers;
pub mod bucket_handlers;
pub mod guards;
pub mod health_handlers;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// A `302 Found` pointing at `location`.
pub fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

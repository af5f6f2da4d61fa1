pub mod admin;
pub mod auth;
pub mod books;
pub mod classes;
pub mod diagnostics;
pub mod guardians;
pub mod health;
pub mod links;
pub mod metrics;
pub mod payments;
pub mod settings;
pub mod students;
pub mod websocket;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::store::resource::ResourceError;

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// The single server-side authorization gate: handlers pass the
/// capability they need, computed from the caller's role.
pub(crate) fn require(allowed: bool) -> Result<(), ApiError> {
    if allowed {
        Ok(())
    } else {
        Err(forbidden())
    }
}

pub(crate) fn forbidden() -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": "Brak uprawnień" })),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

pub(crate) fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
}

pub(crate) fn store_error(err: ResourceError) -> ApiError {
    let status = match err {
        ResourceError::Validation(_) => StatusCode::BAD_REQUEST,
        ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
        ResourceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

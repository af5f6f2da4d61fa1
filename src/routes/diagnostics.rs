use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        diagnostic::{CreateDiagnosticRequest, UpdateDiagnosticRequest},
    },
    routes::{require, store_error, ApiError},
    store::Filters,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct DiagnosticListQuery {
    pub student_id: Option<Uuid>,
}

pub async fn list_diagnostics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<DiagnosticListQuery>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let mut filters = Filters::new();
    if let Some(student_id) = query.student_id {
        filters = filters.eq("student_id", student_id);
    }

    let diagnostics = state
        .store
        .diagnostics
        .list(&filters)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(diagnostics).unwrap()))
}

pub async fn create_diagnostic(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateDiagnosticRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().is_staff)?;

    let diagnostic = state
        .store
        .diagnostics
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(diagnostic).unwrap()),
    ))
}

pub async fn update_diagnostic(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDiagnosticRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let diagnostic = state
        .store
        .diagnostics
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(diagnostic).unwrap()))
}

pub async fn delete_diagnostic(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    state
        .store
        .diagnostics
        .delete(id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({ "message": "Diagnoza usunięta" })))
}

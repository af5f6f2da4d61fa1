use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        student::{CreateStudentRequest, Student, UpdateStudentRequest},
        user::UserRole,
    },
    routes::{bad_request, forbidden, internal_error, not_found, require, store_error, ApiError},
    services::guardians::GuardianService,
    store::Filters,
    AppState,
};

/// Visibility: administrator and konsultant see everyone, a teacher sees
/// the students they created, a guardian the students linked to them.
pub async fn list_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let caps = user.capabilities();
    require(caps.can_view_students_menu)?;

    let students: Vec<Student> = if caps.can_view_all_students {
        state
            .store
            .students
            .list(&Filters::new())
            .await
            .map_err(store_error)?
    } else if user.role == UserRole::Opiekun {
        GuardianService::students_for_guardian(&state.db, user.user_id)
            .await
            .map_err(internal_error)?
    } else {
        state
            .store
            .students
            .list(&Filters::new().eq("created_by", user.user_id))
            .await
            .map_err(store_error)?
    };

    Ok(Json(serde_json::to_value(students).unwrap()))
}

pub async fn get_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let caps = user.capabilities();
    require(caps.can_view_students_menu)?;

    let student = state
        .store
        .students
        .get(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Nie znaleziono ucznia"))?;

    let visible = match user.role {
        UserRole::Administrator | UserRole::Konsultant => true,
        UserRole::Nauczyciel => student.created_by == user.user_id,
        UserRole::Opiekun => GuardianService::is_guardian_of(&state.db, id, user.user_id)
            .await
            .map_err(internal_error)?,
        UserRole::Uczen => false,
    };
    if !visible {
        return Err(forbidden());
    }

    Ok(Json(serde_json::to_value(student).unwrap()))
}

pub async fn create_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().can_create_students)?;
    body.validate().map_err(bad_request)?;

    let student = state
        .store
        .students
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(student).unwrap()),
    ))
}

pub async fn update_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStudentRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_edit_students)?;
    body.validate().map_err(bad_request)?;

    let student = state
        .store
        .students
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(student).unwrap()))
}

pub async fn delete_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_delete_students)?;

    state
        .store
        .students
        .delete(id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({ "message": "Uczeń usunięty" })))
}

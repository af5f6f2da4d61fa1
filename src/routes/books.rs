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
        book::{CreateBookRequest, CreateStudentBookRequest, UpdateBookRequest},
    },
    routes::{bad_request, require, store_error, ApiError},
    store::Filters,
    AppState,
};

pub async fn list_books(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let books = state
        .store
        .books
        .list(&Filters::new())
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(books).unwrap()))
}

pub async fn create_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().is_staff)?;
    body.validate().map_err(bad_request)?;

    let book = state
        .store
        .books
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(book).unwrap()),
    ))
}

pub async fn update_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBookRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let book = state
        .store
        .books
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(book).unwrap()))
}

pub async fn delete_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    state.store.books.delete(id).await.map_err(store_error)?;
    Ok(Json(json!({ "message": "Książka usunięta" })))
}

#[derive(Debug, Deserialize)]
pub struct StudentBookListQuery {
    pub student_id: Option<Uuid>,
    pub ksiazka_id: Option<Uuid>,
}

pub async fn list_student_books(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StudentBookListQuery>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let mut filters = Filters::new();
    if let Some(student_id) = query.student_id {
        filters = filters.eq("student_id", student_id);
    }
    if let Some(ksiazka_id) = query.ksiazka_id {
        filters = filters.eq("ksiazka_id", ksiazka_id);
    }

    let assignments = state
        .store
        .student_books
        .list(&filters)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(assignments).unwrap()))
}

pub async fn assign_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateStudentBookRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().is_staff)?;

    let assignment = state
        .store
        .student_books
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(assignment).unwrap()),
    ))
}

pub async fn unassign_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    state
        .store
        .student_books
        .delete(id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({ "message": "Przypisanie usunięte" })))
}

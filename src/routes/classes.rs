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
        class::{CreateClassRequest, UpdateClassRequest},
        user::UserRole,
    },
    routes::{bad_request, forbidden, internal_error, require, store_error, ApiError},
    services::{classes::ClassService, guardians::GuardianService},
    store::Filters,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ClassListQuery {
    pub student_id: Option<Uuid>,
}

pub async fn list_classes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ClassListQuery>,
) -> Result<Json<Value>, ApiError> {
    let caps = user.capabilities();
    if !caps.is_staff {
        // Guardians read class logs only for their linked students.
        if user.role != UserRole::Opiekun {
            return Err(forbidden());
        }
        let Some(student_id) = query.student_id else {
            return Err(forbidden());
        };
        let linked = GuardianService::is_guardian_of(&state.db, student_id, user.user_id)
            .await
            .map_err(internal_error)?;
        if !linked {
            return Err(forbidden());
        }
    }

    let mut filters = Filters::new();
    if let Some(student_id) = query.student_id {
        filters = filters.eq("student_id", student_id);
    }

    let classes = state
        .store
        .classes
        .list(&filters)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(classes).unwrap()))
}

/// Single or recurring creation. Recurring requests fan out into one
/// insert per week and report partial failure in aggregate.
pub async fn create_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().can_manage_classes)?;
    body.validate().map_err(bad_request)?;

    if body.is_recurring {
        let weeks = body.recurring_weeks.unwrap_or(1);
        let outcome = ClassService::create_recurring(&state.store, &user, &body, weeks).await;
        if outcome.created.is_empty() {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Błąd dodawania zajęć" })),
            ));
        }
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "created": outcome.created.len(),
                "failed": outcome.failed,
                "classes": outcome.created,
            })),
        ));
    }

    let class = state
        .store
        .classes
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(class).unwrap()),
    ))
}

pub async fn update_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClassRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_manage_classes)?;
    body.validate().map_err(bad_request)?;

    let class = state
        .store
        .classes
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(class).unwrap()))
}

pub async fn delete_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_manage_classes)?;

    state.store.classes.delete(id).await.map_err(store_error)?;
    Ok(Json(json!({ "message": "Zajęcia usunięte" })))
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, guardian::AssignGuardianRequest},
    routes::{bad_request, internal_error, require, ApiError},
    services::guardians::GuardianService,
    AppState,
};

pub async fn list_guardians(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_link_guardians)?;

    let guardians = GuardianService::list_for_student(&state.db, student_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::to_value(guardians).unwrap()))
}

pub async fn assign_guardian(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Json(body): Json<AssignGuardianRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_link_guardians)?;

    GuardianService::assign(&state.db, student_id, body.user_id)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(json!({ "message": "Opiekun przypisany" })))
}

pub async fn remove_guardian(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((student_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_link_guardians)?;

    GuardianService::remove(&state.db, student_id, user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "message": "Opiekun odłączony" })))
}

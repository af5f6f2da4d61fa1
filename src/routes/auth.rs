use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{ChangePasswordRequest, LoginRequest, RegisterFromInviteRequest},
    },
    routes::{bad_request, internal_error, not_found, ApiError},
    services::auth::AuthService,
    AppState,
};

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    AuthService::login(
        &state.db,
        state.email.clone(),
        &state.config,
        &body.email,
        &body.password,
    )
    .await
    .map(|response| Json(serde_json::to_value(response).unwrap()))
    .map_err(|e| {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": e.to_string() })),
        )
    })
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let profile = AuthService::me(&state.db, user.user_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Nie znaleziono profilu"))?;
    Ok(Json(serde_json::to_value(profile).unwrap()))
}

pub async fn register_from_invite(
    State(state): State<AppState>,
    Json(body): Json<RegisterFromInviteRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    AuthService::register_from_invite(&state.db, &body)
        .await
        .map(|profile| {
            (
                StatusCode::CREATED,
                Json(serde_json::to_value(profile).unwrap()),
            )
        })
        .map_err(|e| bad_request(e.to_string()))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    AuthService::change_password(
        &state.db,
        user.user_id,
        &body.current_password,
        &body.new_password,
    )
    .await
    .map(|_| Json(json!({ "message": "Hasło zostało zmienione" })))
    .map_err(|e| bad_request(e.to_string()))
}

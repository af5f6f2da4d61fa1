use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    models::{auth::AuthenticatedUser, settings::UpdateAuthSettingsRequest},
    routes::{bad_request, not_found, store_error, ApiError},
    store::Filters,
    AppState,
};

/// GET /auth/settings — the caller's own security settings.
pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .store
        .auth_settings
        .list(&Filters::new().eq("user_id", user.user_id))
        .await
        .map_err(store_error)?
        .into_iter()
        .next()
        .ok_or_else(|| not_found("Nie znaleziono ustawień"))?;
    Ok(Json(serde_json::to_value(settings).unwrap()))
}

/// PUT /auth/settings — partial update of the caller's own row. The
/// lockout fields stay out of reach; only the login flow writes them.
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateAuthSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    body.validate().map_err(bad_request)?;

    let current = state
        .store
        .auth_settings
        .list(&Filters::new().eq("user_id", user.user_id))
        .await
        .map_err(store_error)?
        .into_iter()
        .next()
        .ok_or_else(|| not_found("Nie znaleziono ustawień"))?;

    let updated = state
        .store
        .auth_settings
        .update(current.id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(updated).unwrap()))
}

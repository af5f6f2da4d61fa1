//! Privileged user administration. The caller's role is re-derived from
//! the profile store on every request; the role carried in the JWT (and
//! any client-side gate) is never trusted here.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, user::InviteUserRequest, user::UserRole},
    routes::{bad_request, internal_error, ApiError},
    services::users::UserService,
    AppState,
};

async fn require_admin_from_store(pool: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    match UserService::role_of(pool, user_id).await {
        Ok(Some(UserRole::Administrator)) => Ok(()),
        Ok(_) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Insufficient permissions" })),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// GET /admin/users — all profiles with the derived account email.
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    require_admin_from_store(&state.db, user.user_id).await?;

    let users = UserService::list_with_email(&state.db)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "users": users })))
}

/// POST /admin/invite — invite a user and assign their role.
pub async fn invite_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<InviteUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin_from_store(&state.db, user.user_id).await?;

    let (email, full_name, role) = match (&body.email, &body.full_name, &body.role) {
        (Some(email), Some(full_name), Some(role))
            if !email.is_empty() && !full_name.is_empty() && !role.is_empty() =>
        {
            (email, full_name, role)
        }
        _ => return Err(bad_request("Missing required fields")),
    };

    let role: UserRole = role
        .parse()
        .map_err(|_| bad_request("Invalid role"))?;

    let invitation = UserService::invite(
        &state.db,
        state.email.as_deref(),
        &state.config.app_base_url,
        user.user_id,
        email,
        full_name,
        role,
    )
    .await
    .map_err(internal_error)?;

    Ok(Json(json!({ "success": true, "invitation": invitation })))
}

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
        link::{CreateLinkRequest, OwnerType, UpdateLinkRequest},
    },
    routes::{bad_request, require, store_error, ApiError},
    store::Filters,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LinkListQuery {
    pub owner_type: Option<OwnerType>,
    pub owner_id: Option<Uuid>,
    /// When true, match links with no owner record (owner_id IS NULL).
    #[serde(default)]
    pub unowned: bool,
}

pub async fn list_links(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<LinkListQuery>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let mut filters = Filters::new();
    if let Some(owner_type) = query.owner_type {
        filters = filters.eq("owner_type", owner_type.to_string());
    }
    if query.unowned {
        filters = filters.is_null("owner_id");
    } else if let Some(owner_id) = query.owner_id {
        filters = filters.eq("owner_id", owner_id);
    }

    let links = state.store.links.list(&filters).await.map_err(store_error)?;
    Ok(Json(serde_json::to_value(links).unwrap()))
}

pub async fn create_link(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().is_staff)?;
    body.validate().map_err(bad_request)?;

    let link = state
        .store
        .links
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(link).unwrap()),
    ))
}

pub async fn update_link(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLinkRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    let link = state
        .store
        .links
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(link).unwrap()))
}

pub async fn delete_link(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().is_staff)?;

    state.store.links.delete(id).await.map_err(store_error)?;
    Ok(Json(json!({ "message": "Link usunięty" })))
}

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
        payment::{CreatePaymentRequest, UpdatePaymentRequest},
        user::UserRole,
    },
    routes::{bad_request, forbidden, internal_error, require, store_error, ApiError},
    services::guardians::GuardianService,
    store::Filters,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub student_id: Option<Uuid>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Value>, ApiError> {
    let caps = user.capabilities();
    require(caps.can_view_payments)?;

    if user.role == UserRole::Opiekun {
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

    let payments = state
        .store
        .payments
        .list(&filters)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(payments).unwrap()))
}

pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require(user.capabilities().can_manage_payments)?;
    // Amount is rejected here; nothing reaches the store on failure.
    body.validate().map_err(bad_request)?;

    let payment = state
        .store
        .payments
        .insert(&user, &body)
        .await
        .map_err(store_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(payment).unwrap()),
    ))
}

pub async fn update_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_manage_payments)?;
    body.validate().map_err(bad_request)?;

    let payment = state
        .store
        .payments
        .update(id, &body)
        .await
        .map_err(store_error)?;
    Ok(Json(serde_json::to_value(payment).unwrap()))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require(user.capabilities().can_manage_payments)?;

    state.store.payments.delete(id).await.map_err(store_error)?;
    Ok(Json(json!({ "message": "Płatność usunięta" })))
}

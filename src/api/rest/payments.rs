use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use uuid::Uuid;

use crate::api::rest::auth::{CurrentUser, PaymentCallback};
use crate::api::rest::extract::ApiJson;
use crate::engine::payment::{
    self, PaymentDetails, PaymentStatusUpdate, PaymentValidation,
};
use crate::error::AppError;
use crate::models::ride::Ride;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/:ride_id", get(payment_details))
        .route("/payments/:ride_id/validate", get(validate_ride))
        .route("/payments/:ride_id/status", post(update_status))
        .route("/payments/:ride_id/cash", post(mark_cash))
}

async fn payment_details(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<PaymentDetails>, AppError> {
    Ok(Json(payment::payment_details(&state, user_id, ride_id)?))
}

async fn validate_ride(
    State(state): State<Arc<AppState>>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<PaymentValidation>, AppError> {
    Ok(Json(payment::validate_ride_for_payment(&state, ride_id)?))
}

/// Callback target for the payment collaborator once a charge settles.
async fn update_status(
    State(state): State<Arc<AppState>>,
    _caller: PaymentCallback,
    Path(ride_id): Path<Uuid>,
    ApiJson(payload): ApiJson<PaymentStatusUpdate>,
) -> Result<Json<Ride>, AppError> {
    let ride = payment::update_ride_payment_status(&state, ride_id, payload.payment_status).await?;
    Ok(Json(ride))
}

async fn mark_cash(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(payment::mark_cash_payment(&state, user_id, ride_id).await?))
}

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::extract::ApiJson;
use crate::engine::lifecycle::{self, ApplyRequest, CreateRideRequest};
use crate::engine::rating::{self, RateRideRequest};
use crate::error::AppError;
use crate::models::application::{ApplicationView, RideApplication};
use crate::models::rating::Rating;
use crate::models::ride::Ride;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(create_ride))
        .route("/rides/pending", get(pending_rides))
        .route("/rides/mine", get(my_rides))
        .route("/rides/:id", get(get_ride))
        .route("/rides/:id/apply", post(apply_for_ride))
        .route("/rides/:id/applications", get(list_applications))
        .route("/rides/:id/select-driver", post(select_driver))
        .route("/rides/:id/start", post(start_ride))
        .route("/rides/:id/complete", post(complete_ride))
        .route("/rides/:id/cancel", post(cancel_ride))
        .route("/rides/:id/rate", post(rate_ride))
        .route("/rides/:id/ratings", get(ride_ratings))
}

#[derive(Deserialize)]
pub struct SelectDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Deserialize)]
pub struct CancelRideRequest {
    pub cancel_reason: String,
}

async fn create_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(payload): ApiJson<CreateRideRequest>,
) -> Result<Json<Ride>, AppError> {
    let ride = lifecycle::create_ride(&state, user_id, payload).await?;
    Ok(Json(ride))
}

async fn pending_rides(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Ride>>, AppError> {
    Ok(Json(lifecycle::list_pending_rides(&state, user_id)?))
}

async fn my_rides(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Vec<Ride>> {
    Json(lifecycle::list_my_rides(&state, user_id))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::get_ride(&state, user_id, id)?))
}

async fn apply_for_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ApplyRequest>,
) -> Result<Json<RideApplication>, AppError> {
    let application = lifecycle::apply_for_ride(&state, user_id, id, payload).await?;
    Ok(Json(application))
}

async fn list_applications(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationView>>, AppError> {
    let views = lifecycle::list_applications(&state, user_id, id).await?;
    Ok(Json(views))
}

async fn select_driver(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<SelectDriverRequest>,
) -> Result<Json<Ride>, AppError> {
    let ride = lifecycle::select_driver(&state, user_id, id, payload.driver_id).await?;
    Ok(Json(ride))
}

async fn start_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::start_ride(&state, user_id, id).await?))
}

async fn complete_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, AppError> {
    Ok(Json(lifecycle::complete_ride(&state, user_id, id).await?))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<CancelRideRequest>,
) -> Result<Json<Ride>, AppError> {
    let ride = lifecycle::cancel_ride(&state, user_id, id, &payload.cancel_reason).await?;
    Ok(Json(ride))
}

async fn rate_ride(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<RateRideRequest>,
) -> Result<Json<Rating>, AppError> {
    let rating = rating::rate_ride(&state, user_id, id, payload).await?;
    Ok(Json(rating))
}

async fn ride_ratings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Rating>>, AppError> {
    Ok(Json(rating::ratings_for_ride(&state, user_id, id)?))
}

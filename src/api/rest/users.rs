use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::ApiJson;
use crate::directory::RegisterUserRequest;
use crate::engine::rating::{RatedAs, rating_summary};
use crate::error::AppError;
use crate::models::rating::RatingSummary;
use crate::models::user::UserProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/rating-summary", get(get_rating_summary))
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    #[serde(rename = "as")]
    pub rated_as: Option<RatedAs>,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = state.directory.register(payload)?;
    Ok(Json(profile))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.directory.get_profile(id)?))
}

async fn get_rating_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<RatingSummary>, AppError> {
    let summary = rating_summary(&state, id, query.rated_as.unwrap_or(RatedAs::Driver))?;
    Ok(Json(summary))
}

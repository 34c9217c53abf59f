use chrono::Utc;
use serde::Deserialize;
use serde_json::{Number, json};
use tracing::info;
use uuid::Uuid;

use crate::engine::guard::{Ownership, load_ride, require_ownership};
use crate::engine::{lock_ride, notify, timed};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::rating::{
    MAX_COMMENT_CHARS, MAX_SCORE, MIN_SCORE, RaterType, Rating, RatingSummary,
};
use crate::models::ride::RideStatus;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct RateRideRequest {
    /// Kept as a raw JSON number so fractional scores fail validation
    /// rather than deserialization.
    pub score: Number,
    pub comment: Option<String>,
}

/// Which side of past rides a summary covers.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RatedAs {
    Driver,
    Rider,
}

fn validate(request: RateRideRequest) -> Result<(u8, Option<String>), AppError> {
    let score = request
        .score
        .as_i64()
        .filter(|score| (MIN_SCORE..=MAX_SCORE).contains(score))
        .ok_or_else(|| {
            AppError::Validation(format!(
                "score must be an integer between {MIN_SCORE} and {MAX_SCORE}, got {}",
                request.score
            ))
        })?;

    let comment = request
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(comment) = &comment {
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::Validation(format!(
                "comment exceeds {MAX_COMMENT_CHARS} characters"
            )));
        }
    }

    Ok((score as u8, comment))
}

pub async fn rate_ride(
    state: &AppState,
    rater_id: Uuid,
    ride_id: Uuid,
    request: RateRideRequest,
) -> Result<Rating, AppError> {
    timed(state, "rate_ride", async {
        let (score, comment) = validate(request)?;

        let rating = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            ride.require_status(RideStatus::Completed, "rate")?;

            let driver_id = ride.driver_id.ok_or_else(|| {
                AppError::Internal(format!("completed ride {ride_id} has no driver"))
            })?;

            let (rater_type, rated_user_id) = if ride.is_rider(rater_id) {
                (RaterType::User, driver_id)
            } else if ride.is_assigned_driver(rater_id) {
                (RaterType::Driver, ride.user_id)
            } else {
                return Err(AppError::Forbidden(format!(
                    "only the rider or driver of ride {ride_id} can rate it"
                )));
            };

            if state.store.find_rating(ride_id, rater_id).is_some() {
                return Err(AppError::AlreadyRated {
                    ride_id: ride_id.to_string(),
                    rater_id: rater_id.to_string(),
                });
            }

            state.store.create_rating(Rating {
                rating_id: Uuid::new_v4(),
                ride_id,
                rater_id,
                rater_type,
                rated_user_id,
                score,
                comment,
                created_at: Utc::now(),
            })?
        };

        info!(ride_id = %ride_id, rater_id = %rater_id, score, "ride rated");
        notify(
            state,
            rating.rated_user_id,
            Notification::new(
                NotificationKind::RatingReceived,
                "You received a new rating",
                json!({
                    "ride_id": ride_id,
                    "rating_id": rating.rating_id,
                    "score": rating.score,
                }),
            ),
        );

        Ok(rating)
    })
    .await
}

pub fn ratings_for_ride(
    state: &AppState,
    user_id: Uuid,
    ride_id: Uuid,
) -> Result<Vec<Rating>, AppError> {
    let ride = load_ride(state, ride_id)?;
    require_ownership(&ride, user_id, Ownership::Participant, "view ratings for")?;
    Ok(state.store.ratings_for_ride(ride_id))
}

pub fn rating_summary(
    state: &AppState,
    user_id: Uuid,
    rated_as: RatedAs,
) -> Result<RatingSummary, AppError> {
    state.directory.get_profile(user_id)?;

    let from = match rated_as {
        RatedAs::Driver => RaterType::User,
        RatedAs::Rider => RaterType::Driver,
    };

    let ratings = state.store.ratings_received(user_id, from);
    Ok(RatingSummary::from_ratings(user_id, &ratings))
}

#[cfg(test)]
mod tests {
    use serde_json::Number;
    use uuid::Uuid;

    use super::{RateRideRequest, RatedAs, rate_ride, rating_summary};
    use crate::directory::RegisterUserRequest;
    use crate::engine::lifecycle::{
        ApplyRequest, CreateRideRequest, apply_for_ride, complete_ride, create_ride,
        select_driver, start_ride,
    };
    use crate::error::AppError;
    use crate::models::location::{Coordinates, Location};
    use crate::models::user::Role;
    use crate::state::AppState;

    struct Trip {
        state: AppState,
        rider: Uuid,
        driver: Uuid,
        ride_id: Uuid,
    }

    fn register(state: &AppState, role: Role, name: &str) -> Uuid {
        state
            .directory
            .register(RegisterUserRequest {
                id: None,
                name: name.to_string(),
                email: String::new(),
                phone: String::new(),
                role,
                license: Some("L-1".to_string()),
                vehicle_info: Some("CNG".to_string()),
            })
            .unwrap()
            .id
    }

    async fn ongoing_trip() -> Trip {
        let state = AppState::new(8);
        let rider = register(&state, Role::Rider, "rider");
        let driver = register(&state, Role::Driver, "driver");
        let point = Coordinates {
            latitude: 23.75,
            longitude: 90.39,
        };

        let ride = create_ride(
            &state,
            rider,
            CreateRideRequest {
                pickup: "Dhanmondi".to_string(),
                drop: "Motijheel".to_string(),
                pickup_coordinates: point,
                drop_coordinates: point,
            },
        )
        .await
        .unwrap();
        apply_for_ride(
            &state,
            driver,
            ride.ride_id,
            ApplyRequest {
                current_location: Location::default(),
            },
        )
        .await
        .unwrap();
        select_driver(&state, rider, ride.ride_id, driver).await.unwrap();
        start_ride(&state, driver, ride.ride_id).await.unwrap();

        Trip {
            state,
            rider,
            driver,
            ride_id: ride.ride_id,
        }
    }

    fn five_stars() -> RateRideRequest {
        RateRideRequest {
            score: Number::from(5_i64),
            comment: Some("smooth ride".to_string()),
        }
    }

    #[tokio::test]
    async fn ongoing_ride_cannot_be_rated() {
        let trip = ongoing_trip().await;
        let err = rate_ride(&trip.state, trip.rider, trip.ride_id, five_stars())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn second_rating_by_same_rater_is_rejected() {
        let trip = ongoing_trip().await;
        complete_ride(&trip.state, trip.driver, trip.ride_id)
            .await
            .unwrap();

        rate_ride(&trip.state, trip.rider, trip.ride_id, five_stars())
            .await
            .unwrap();
        let err = rate_ride(&trip.state, trip.rider, trip.ride_id, five_stars())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyRated { .. }));
        assert_eq!(trip.state.store.ratings_for_ride(trip.ride_id).len(), 1);
    }

    #[tokio::test]
    async fn both_parties_rate_each_other() {
        let trip = ongoing_trip().await;
        complete_ride(&trip.state, trip.driver, trip.ride_id)
            .await
            .unwrap();

        let by_rider = rate_ride(&trip.state, trip.rider, trip.ride_id, five_stars())
            .await
            .unwrap();
        let by_driver = rate_ride(
            &trip.state,
            trip.driver,
            trip.ride_id,
            RateRideRequest {
                score: Number::from(3_i64),
                comment: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(by_rider.rated_user_id, trip.driver);
        assert_eq!(by_driver.rated_user_id, trip.rider);

        let driver_summary = rating_summary(&trip.state, trip.driver, RatedAs::Driver).unwrap();
        assert_eq!(driver_summary.total_ratings, 1);
        assert_eq!(driver_summary.average_rating, 5.0);

        let rider_summary = rating_summary(&trip.state, trip.rider, RatedAs::Rider).unwrap();
        assert_eq!(rider_summary.breakdown[&3], 1);
    }

    #[tokio::test]
    async fn outsiders_and_bad_scores_are_rejected() {
        let trip = ongoing_trip().await;
        complete_ride(&trip.state, trip.driver, trip.ride_id)
            .await
            .unwrap();

        let err = rate_ride(&trip.state, Uuid::new_v4(), trip.ride_id, five_stars())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let fractional = Number::from_f64(4.5).unwrap();
        for score in [0_i64, 6, -1].map(Number::from).into_iter().chain([fractional]) {
            let err = rate_ride(
                &trip.state,
                trip.rider,
                trip.ride_id,
                RateRideRequest {
                    score,
                    comment: None,
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let err = rate_ride(
            &trip.state,
            trip.rider,
            trip.ride_id,
            RateRideRequest {
                score: Number::from(4_i64),
                comment: Some("x".repeat(501)),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(trip.state.store.ratings_for_ride(trip.ride_id).is_empty());
    }
}

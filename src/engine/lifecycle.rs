use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::guard::{Ownership, load_ride, require_ownership, require_role};
use crate::engine::{apply_to_ride, count_delivery, lock_ride, notify, publish_transition, timed};
use crate::error::AppError;
use crate::geo::fare::calculate_fare;
use crate::geo::location::{format_location, parse_location};
use crate::models::application::{ApplicationView, RideApplication};
use crate::models::location::{Coordinates, Location};
use crate::models::notification::{Notification, NotificationKind};
use crate::models::ride::{Ride, RideStatus};
use crate::models::user::Role;
use crate::state::AppState;

const MAX_DESCRIPTOR_CHARS: usize = 255;
const MAX_CANCEL_REASON_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRideRequest {
    pub pickup: String,
    pub drop: String,
    pub pickup_coordinates: Coordinates,
    pub drop_coordinates: Coordinates,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyRequest {
    pub current_location: Location,
}

fn descriptor(raw: &str, field: &str) -> Result<String, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_DESCRIPTOR_CHARS {
        return Err(AppError::Validation(format!(
            "{field} exceeds {MAX_DESCRIPTOR_CHARS} characters"
        )));
    }
    Ok(value.to_string())
}

/// Connected users whose profile says they drive.
fn online_driver_ids(state: &AppState) -> Vec<Uuid> {
    state
        .notifier
        .connected_users()
        .into_iter()
        .filter(|user_id| state.directory.verify_role(*user_id, Role::Driver))
        .collect()
}

pub async fn create_ride(
    state: &AppState,
    rider_id: Uuid,
    request: CreateRideRequest,
) -> Result<Ride, AppError> {
    timed(state, "create_ride", async {
        require_role(state, rider_id, Role::Rider, "create ride requests")?;

        let pickup = descriptor(&request.pickup, "pickup")?;
        let drop = descriptor(&request.drop, "drop")?;
        let fare = calculate_fare(&request.pickup_coordinates, &request.drop_coordinates);

        let ride = state.store.create_ride(Ride::new(
            rider_id,
            pickup,
            drop,
            request.pickup_coordinates,
            request.drop_coordinates,
            fare,
        ))?;

        info!(ride_id = %ride.ride_id, rider_id = %rider_id, fare, "ride requested");
        publish_transition(state, &ride);

        let announcement = Notification::new(
            NotificationKind::NewRide,
            "New ride request available",
            serde_json::to_value(&ride).unwrap_or_default(),
        );
        let drivers = online_driver_ids(state);
        for delivery in state.notifier.broadcast_to_drivers(&announcement, &drivers) {
            count_delivery(state, delivery);
        }

        Ok(ride)
    })
    .await
}

pub async fn apply_for_ride(
    state: &AppState,
    driver_id: Uuid,
    ride_id: Uuid,
    request: ApplyRequest,
) -> Result<RideApplication, AppError> {
    timed(state, "apply_for_ride", async {
        require_role(state, driver_id, Role::Driver, "apply for rides")?;

        let location = request.current_location;
        if !location.coordinates().is_valid() {
            return Err(AppError::Validation(format!(
                "malformed current_location ({}, {})",
                location.latitude, location.longitude
            )));
        }

        let (ride, application) = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            ride.require_status(RideStatus::Pending, "apply for")?;

            if state.store.find_application(ride_id, driver_id).is_some() {
                return Err(AppError::DuplicateApplication {
                    ride_id: ride_id.to_string(),
                    driver_id: driver_id.to_string(),
                });
            }

            let application = state.store.create_application(RideApplication {
                application_id: Uuid::new_v4(),
                ride_id,
                driver_id,
                locations: format_location(
                    location.latitude,
                    location.longitude,
                    location.address.as_deref(),
                ),
                applied_at: Utc::now(),
            })?;

            (ride, application)
        };

        info!(ride_id = %ride_id, driver_id = %driver_id, "driver applied");
        notify(
            state,
            ride.user_id,
            Notification::new(
                NotificationKind::NewApplication,
                "A driver has applied for your ride",
                json!({
                    "ride_id": ride_id,
                    "application_id": application.application_id,
                    "driver_id": driver_id,
                }),
            ),
        );

        Ok(application)
    })
    .await
}

/// Applications in arrival order, each joined with the driver's profile.
/// Applications whose driver profile cannot be read are left out.
pub async fn list_applications(
    state: &AppState,
    requester_id: Uuid,
    ride_id: Uuid,
) -> Result<Vec<ApplicationView>, AppError> {
    timed(state, "list_applications", async {
        let ride = load_ride(state, ride_id)?;
        require_ownership(&ride, requester_id, Ownership::Rider, "view applications for")?;

        let views = state
            .store
            .applications_for_ride(ride_id)
            .into_iter()
            .filter_map(|app| match state.directory.driver_card(app.driver_id) {
                Ok(card) => Some(ApplicationView {
                    application_id: app.application_id,
                    ride_id: app.ride_id,
                    driver_id: app.driver_id,
                    applied_at: app.applied_at,
                    driver_name: card.name,
                    driver_phone: card.phone,
                    license: card.license,
                    vehicle_info: card.vehicle_info,
                    current_location: parse_location(&app.locations),
                }),
                Err(err) => {
                    warn!(
                        ride_id = %ride_id,
                        driver_id = %app.driver_id,
                        error = %err,
                        "skipping application: driver profile unavailable"
                    );
                    None
                }
            })
            .collect();

        Ok(views)
    })
    .await
}

pub async fn select_driver(
    state: &AppState,
    rider_id: Uuid,
    ride_id: Uuid,
    driver_id: Uuid,
) -> Result<Ride, AppError> {
    timed(state, "select_driver", async {
        let ride = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            require_ownership(&ride, rider_id, Ownership::Rider, "select a driver for")?;
            ride.require_status(RideStatus::Pending, "select a driver for")?;

            if state.store.find_application(ride_id, driver_id).is_none() {
                return Err(AppError::NotApplied {
                    ride_id: ride_id.to_string(),
                    driver_id: driver_id.to_string(),
                });
            }

            apply_to_ride(state, ride_id, |ride| ride.confirm(driver_id))?
        };

        info!(ride_id = %ride_id, driver_id = %driver_id, "driver selected");
        publish_transition(state, &ride);

        notify(
            state,
            driver_id,
            Notification::for_ride(
                NotificationKind::RideConfirmed,
                "You have been selected for a ride",
                ride_id,
            ),
        );

        for application in state.store.applications_for_ride(ride_id) {
            if application.driver_id != driver_id {
                notify(
                    state,
                    application.driver_id,
                    Notification::for_ride(
                        NotificationKind::RideUnavailable,
                        "Ride is no longer available",
                        ride_id,
                    ),
                );
            }
        }

        Ok(ride)
    })
    .await
}

pub async fn start_ride(state: &AppState, driver_id: Uuid, ride_id: Uuid) -> Result<Ride, AppError> {
    timed(state, "start_ride", async {
        let ride = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            require_ownership(&ride, driver_id, Ownership::AssignedDriver, "start")?;
            ride.require_status(RideStatus::Confirmed, "start")?;

            apply_to_ride(state, ride_id, |ride| ride.start(Utc::now()))?
        };

        info!(ride_id = %ride_id, driver_id = %driver_id, "ride started");
        publish_transition(state, &ride);
        notify(
            state,
            ride.user_id,
            Notification::for_ride(NotificationKind::RideStarted, "Your ride has started", ride_id),
        );

        Ok(ride)
    })
    .await
}

pub async fn complete_ride(
    state: &AppState,
    driver_id: Uuid,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    timed(state, "complete_ride", async {
        let ride = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            require_ownership(&ride, driver_id, Ownership::AssignedDriver, "complete")?;
            ride.require_status(RideStatus::Ongoing, "complete")?;

            apply_to_ride(state, ride_id, |ride| ride.complete(Utc::now()))?
        };

        info!(ride_id = %ride_id, driver_id = %driver_id, fare = ride.fare, "ride completed");
        publish_transition(state, &ride);

        let data = json!({
            "ride_id": ride_id,
            "fare": ride.fare,
            "can_rate": true,
        });
        notify(
            state,
            ride.user_id,
            Notification::new(
                NotificationKind::RideCompleted,
                "Your ride has been completed. You can now rate your driver",
                data.clone(),
            ),
        );
        notify(
            state,
            driver_id,
            Notification::new(
                NotificationKind::RideCompleted,
                "Ride completed. You can now rate your rider",
                data,
            ),
        );

        Ok(ride)
    })
    .await
}

pub async fn cancel_ride(
    state: &AppState,
    actor_id: Uuid,
    ride_id: Uuid,
    reason: &str,
) -> Result<Ride, AppError> {
    timed(state, "cancel_ride", async {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("cancel_reason cannot be empty".to_string()));
        }
        if reason.chars().count() > MAX_CANCEL_REASON_CHARS {
            return Err(AppError::Validation(format!(
                "cancel_reason exceeds {MAX_CANCEL_REASON_CHARS} characters"
            )));
        }

        let (counterpart, ride) = {
            let _guard = lock_ride(state, ride_id).await?;

            let before = load_ride(state, ride_id)?;
            require_ownership(&before, actor_id, Ownership::Participant, "cancel")?;

            let ride = apply_to_ride(state, ride_id, |ride| {
                ride.cancel(actor_id, reason.to_string())
            })?;

            (before.counterpart_of(actor_id), ride)
        };

        info!(ride_id = %ride_id, actor_id = %actor_id, reason, "ride cancelled");
        publish_transition(state, &ride);

        if let Some(other) = counterpart {
            notify(
                state,
                other,
                Notification::new(
                    NotificationKind::RideCancelled,
                    "The ride has been cancelled",
                    json!({ "ride_id": ride_id, "reason": reason }),
                ),
            );
        }

        Ok(ride)
    })
    .await
}

/// Riders and the assigned driver may always read a ride; other drivers only
/// while it is still open for applications.
pub fn get_ride(state: &AppState, user_id: Uuid, ride_id: Uuid) -> Result<Ride, AppError> {
    let ride = load_ride(state, ride_id)?;

    let open_to_driver =
        ride.status == RideStatus::Pending && state.directory.verify_role(user_id, Role::Driver);
    if open_to_driver {
        return Ok(ride);
    }

    require_ownership(&ride, user_id, Ownership::Participant, "view")?;
    Ok(ride)
}

pub fn list_pending_rides(state: &AppState, driver_id: Uuid) -> Result<Vec<Ride>, AppError> {
    require_role(state, driver_id, Role::Driver, "view pending rides")?;
    Ok(state.store.rides_by_status(RideStatus::Pending))
}

pub fn list_my_rides(state: &AppState, user_id: Uuid) -> Vec<Ride> {
    state.store.rides_for_user(user_id)
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::engine::guard::load_ride;
use crate::engine::{apply_to_ride, lock_ride, notify, timed};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::ride::{PaymentStatus, Ride, RideStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentValidation {
    pub valid: bool,
    pub ride_id: Uuid,
    pub fare: f64,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: RideStatus,
    pub payment_status: PaymentStatus,
    pub fare: f64,
    pub pickup: String,
    pub drop: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
}

fn check_payable(ride: &Ride) -> Result<PaymentValidation, AppError> {
    if ride.status != RideStatus::Completed {
        return Err(AppError::InvalidState(format!(
            "ride {} must be completed before payment",
            ride.ride_id
        )));
    }
    if ride.payment_status == PaymentStatus::Paid {
        return Err(AppError::InvalidState(format!(
            "payment for ride {} already completed",
            ride.ride_id
        )));
    }
    if !ride.fare.is_finite() || ride.fare <= 0.0 {
        return Err(AppError::Validation(format!(
            "ride {} has an invalid fare",
            ride.ride_id
        )));
    }

    Ok(PaymentValidation {
        valid: true,
        ride_id: ride.ride_id,
        fare: ride.fare,
        user_id: ride.user_id,
        driver_id: ride.driver_id,
    })
}

fn write_payment_status(
    state: &AppState,
    ride_id: Uuid,
    payment_status: PaymentStatus,
) -> Result<Ride, AppError> {
    apply_to_ride(state, ride_id, |ride| {
        ride.payment_status = payment_status;
        ride.updated_at = Utc::now();
        Ok(())
    })
}

fn announce_payment(state: &AppState, ride: &Ride) {
    let notification = Notification::new(
        NotificationKind::PaymentUpdated,
        format!("Payment status is now {}", ride.payment_status.as_str()),
        json!({
            "ride_id": ride.ride_id,
            "payment_status": ride.payment_status,
            "fare": ride.fare,
        }),
    );

    notify(state, ride.user_id, notification.clone());
    if let Some(driver_id) = ride.driver_id {
        notify(state, driver_id, notification);
    }
}

pub fn validate_ride_for_payment(
    state: &AppState,
    ride_id: Uuid,
) -> Result<PaymentValidation, AppError> {
    let ride = load_ride(state, ride_id)?;
    check_payable(&ride)
}

/// Flips `payment_status` on behalf of the payment collaborator. Not a ride
/// state transition.
pub async fn update_ride_payment_status(
    state: &AppState,
    ride_id: Uuid,
    payment_status: PaymentStatus,
) -> Result<Ride, AppError> {
    timed(state, "update_payment_status", async {
        let ride = {
            let _guard = lock_ride(state, ride_id).await?;
            write_payment_status(state, ride_id, payment_status)?
        };

        info!(ride_id = %ride_id, payment_status = payment_status.as_str(), "payment status updated");
        announce_payment(state, &ride);
        Ok(ride)
    })
    .await
}

/// The assigned driver confirms the rider paid in cash.
pub async fn mark_cash_payment(
    state: &AppState,
    driver_id: Uuid,
    ride_id: Uuid,
) -> Result<Ride, AppError> {
    timed(state, "mark_cash_payment", async {
        let ride = {
            let _guard = lock_ride(state, ride_id).await?;

            let ride = load_ride(state, ride_id)?;
            check_payable(&ride)?;
            if !verify_driver_for_ride(state, driver_id, ride_id) {
                return Err(AppError::Forbidden(
                    "only the assigned driver can mark cash payment".to_string(),
                ));
            }

            write_payment_status(state, ride_id, PaymentStatus::Paid)?
        };

        info!(ride_id = %ride_id, driver_id = %driver_id, fare = ride.fare, "cash payment recorded");
        announce_payment(state, &ride);
        Ok(ride)
    })
    .await
}

pub fn payment_details(
    state: &AppState,
    user_id: Uuid,
    ride_id: Uuid,
) -> Result<PaymentDetails, AppError> {
    let ride = load_ride(state, ride_id)?;
    if !(verify_rider_for_ride(state, user_id, ride_id)
        || verify_driver_for_ride(state, user_id, ride_id))
    {
        return Err(AppError::Forbidden(format!(
            "only the rider or assigned driver can view payment details for ride {ride_id}"
        )));
    }

    Ok(PaymentDetails {
        ride_id: ride.ride_id,
        user_id: ride.user_id,
        driver_id: ride.driver_id,
        status: ride.status,
        payment_status: ride.payment_status,
        fare: ride.fare,
        pickup: ride.pickup,
        drop: ride.drop,
    })
}

/// Whether `driver_id` is the driver currently assigned to the ride.
pub fn verify_driver_for_ride(state: &AppState, driver_id: Uuid, ride_id: Uuid) -> bool {
    state
        .store
        .get_ride(ride_id)
        .is_some_and(|ride| ride.is_assigned_driver(driver_id))
}

pub fn verify_rider_for_ride(state: &AppState, user_id: Uuid, ride_id: Uuid) -> bool {
    state
        .store
        .get_ride(ride_id)
        .is_some_and(|ride| ride.is_rider(user_id))
}

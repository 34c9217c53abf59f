use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::Coordinates;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Confirmed => "confirmed",
            RideStatus::Ongoing => "ongoing",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses in which a driver is attached to the ride.
    pub fn has_driver(&self) -> bool {
        matches!(
            self,
            RideStatus::Confirmed | RideStatus::Ongoing | RideStatus::Completed
        )
    }

    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Ongoing)
                | (Ongoing, Completed)
                | (Pending | Confirmed | Ongoing, Cancelled)
        )
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: String,
    pub drop: String,
    pub pickup_coordinates: Coordinates,
    pub drop_coordinates: Coordinates,
    pub status: RideStatus,
    pub payment_status: PaymentStatus,
    pub fare: f64,
    pub requested_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    /// The driver that was attached when the ride was cancelled.
    pub cancelled_driver_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        user_id: Uuid,
        pickup: String,
        drop: String,
        pickup_coordinates: Coordinates,
        drop_coordinates: Coordinates,
        fare: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            ride_id: Uuid::new_v4(),
            user_id,
            driver_id: None,
            pickup,
            drop,
            pickup_coordinates,
            drop_coordinates,
            status: RideStatus::Pending,
            payment_status: PaymentStatus::Pending,
            fare,
            requested_at: now,
            start_time: None,
            end_time: None,
            cancel_reason: None,
            cancelled_by: None,
            cancelled_driver_id: None,
            updated_at: now,
        }
    }

    pub fn is_rider(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_assigned_driver(&self, user_id: Uuid) -> bool {
        self.driver_id == Some(user_id)
    }

    /// The party on the other side of `actor`, if one is attached.
    pub fn counterpart_of(&self, actor: Uuid) -> Option<Uuid> {
        if self.is_rider(actor) {
            self.driver_id
        } else {
            Some(self.user_id)
        }
    }

    pub fn require_status(&self, expected: RideStatus, action: &str) -> Result<(), AppError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "cannot {action} ride {}: status is {}, expected {expected}",
                self.ride_id, self.status
            )))
        }
    }

    fn transition(&mut self, next: RideStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "ride {} cannot move from {} to {next}",
                self.ride_id, self.status
            )));
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn confirm(&mut self, driver_id: Uuid) -> Result<(), AppError> {
        self.transition(RideStatus::Confirmed)?;
        self.driver_id = Some(driver_id);
        Ok(())
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.transition(RideStatus::Ongoing)?;
        self.start_time = Some(at);
        Ok(())
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.transition(RideStatus::Completed)?;
        self.end_time = Some(at);
        Ok(())
    }

    /// Cancelling moves the driver into `cancelled_driver_id` so that
    /// `driver_id` stays tied to the driver-bearing statuses.
    pub fn cancel(&mut self, actor: Uuid, reason: String) -> Result<(), AppError> {
        self.transition(RideStatus::Cancelled)?;
        self.cancelled_driver_id = self.driver_id.take();
        self.cancel_reason = Some(reason);
        self.cancelled_by = Some(actor);
        Ok(())
    }
}

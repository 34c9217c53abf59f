use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewRide,
    NewApplication,
    RideConfirmed,
    RideUnavailable,
    RideStarted,
    RideCompleted,
    RideCancelled,
    RatingReceived,
    PaymentUpdated,
    RideUpdate,
    Subscribed,
    DriverLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            message: message.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn for_ride(kind: NotificationKind, message: impl Into<String>, ride_id: Uuid) -> Self {
        Self::new(kind, message, json!({ "ride_id": ride_id }))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::Location;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideApplication {
    pub application_id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    /// Serialized location snapshot taken when the driver applied.
    pub locations: String,
    pub applied_at: DateTime<Utc>,
}

/// An application joined with the applying driver's profile.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub applied_at: DateTime<Utc>,
    pub driver_name: String,
    pub driver_phone: String,
    pub license: String,
    pub vehicle_info: String,
    pub current_location: Location,
}

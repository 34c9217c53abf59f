use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub license: String,
    pub vehicle_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub vehicle: Option<VehicleDetails>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a driver's profile shown to riders choosing between applicants.
#[derive(Debug, Clone, Serialize)]
pub struct DriverCard {
    pub name: String,
    pub phone: String,
    pub license: String,
    pub vehicle_info: String,
}

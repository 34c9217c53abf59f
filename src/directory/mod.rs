use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{DriverCard, Role, UserProfile, VehicleDetails};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserRequest {
    /// Callers may pin the id (e.g. the auth provider's subject); generated otherwise.
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    pub license: Option<String>,
    pub vehicle_info: Option<String>,
}

/// Authoritative user/driver profiles. Lookups are never cached by callers.
#[derive(Default)]
pub struct Directory {
    profiles: DashMap<Uuid, UserProfile>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn register(&self, request: RegisterUserRequest) -> Result<UserProfile, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }

        let vehicle = match request.role {
            Role::Driver => {
                let license = non_blank(request.license).ok_or_else(|| {
                    AppError::Validation("drivers must provide a license".to_string())
                })?;
                let vehicle_info = non_blank(request.vehicle_info).ok_or_else(|| {
                    AppError::Validation("drivers must provide vehicle_info".to_string())
                })?;
                Some(VehicleDetails {
                    license,
                    vehicle_info,
                })
            }
            Role::Rider | Role::Admin => None,
        };

        let profile = UserProfile {
            id: request.id.unwrap_or_else(Uuid::new_v4),
            name: name.to_string(),
            email: request.email,
            phone: request.phone,
            role: request.role,
            vehicle,
            created_at: Utc::now(),
        };

        match self.profiles.entry(profile.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Validation(format!(
                "user {} already registered",
                profile.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    pub fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        self.profiles
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
    }

    pub fn verify_role(&self, user_id: Uuid, role: Role) -> bool {
        self.profiles
            .get(&user_id)
            .is_some_and(|entry| entry.role == role)
    }

    pub fn driver_card(&self, driver_id: Uuid) -> Result<DriverCard, AppError> {
        let profile = self.get_profile(driver_id)?;
        if profile.role != Role::Driver {
            return Err(AppError::Forbidden(format!("user {driver_id} is not a driver")));
        }

        let vehicle = profile.vehicle.ok_or_else(|| {
            AppError::NotFound(format!("driver {driver_id} has no vehicle details"))
        })?;

        Ok(DriverCard {
            name: profile.name,
            phone: profile.phone,
            license: vehicle.license,
            vehicle_info: vehicle.vehicle_info,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Directory, RegisterUserRequest};
    use crate::error::AppError;
    use crate::models::user::Role;

    fn request(role: Role) -> RegisterUserRequest {
        RegisterUserRequest {
            id: None,
            name: "Rahim".to_string(),
            email: "rahim@example.com".to_string(),
            phone: "+8801700000000".to_string(),
            role,
            license: Some("DHA-1234".to_string()),
            vehicle_info: Some("Toyota Axio".to_string()),
        }
    }

    #[test]
    fn driver_without_license_is_rejected() {
        let directory = Directory::new();
        let mut req = request(Role::Driver);
        req.license = Some("   ".to_string());

        assert!(matches!(directory.register(req), Err(AppError::Validation(_))));
    }

    #[test]
    fn verify_role_is_false_for_unknown_users() {
        let directory = Directory::new();
        assert!(!directory.verify_role(Uuid::new_v4(), Role::Rider));
    }

    #[test]
    fn rider_has_no_driver_card() {
        let directory = Directory::new();
        let rider = directory.register(request(Role::Rider)).unwrap();

        assert!(directory.verify_role(rider.id, Role::Rider));
        assert!(matches!(
            directory.driver_card(rider.id),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn pinned_id_cannot_be_registered_twice() {
        let directory = Directory::new();
        let id = Uuid::new_v4();
        let mut req = request(Role::Rider);
        req.id = Some(id);
        directory.register(req.clone()).unwrap();

        assert!(directory.register(req).is_err());
        assert_eq!(directory.len(), 1);
    }
}

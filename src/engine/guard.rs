use uuid::Uuid;

use crate::error::AppError;
use crate::models::ride::Ride;
use crate::models::user::Role;
use crate::state::AppState;

/// Which relationship to a ride an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Rider,
    AssignedDriver,
    /// Either the rider or the assigned driver.
    Participant,
}

pub fn require_role(
    state: &AppState,
    actor: Uuid,
    role: Role,
    action: &str,
) -> Result<(), AppError> {
    if state.directory.verify_role(actor, role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "only {}s can {action}",
            role.as_str()
        )))
    }
}

pub fn require_ownership(
    ride: &Ride,
    actor: Uuid,
    ownership: Ownership,
    action: &str,
) -> Result<(), AppError> {
    let allowed = match ownership {
        Ownership::Rider => ride.is_rider(actor),
        Ownership::AssignedDriver => ride.is_assigned_driver(actor),
        Ownership::Participant => ride.is_rider(actor) || ride.is_assigned_driver(actor),
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "you don't have permission to {action} ride {}",
            ride.ride_id
        )))
    }
}

pub fn load_ride(state: &AppState, ride_id: Uuid) -> Result<Ride, AppError> {
    state
        .store
        .get_ride(ride_id)
        .ok_or_else(|| AppError::NotFound(format!("ride {ride_id} not found")))
}

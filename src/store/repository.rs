use uuid::Uuid;

use crate::models::application::RideApplication;
use crate::models::rating::{RaterType, Rating};
use crate::models::ride::{Ride, RideStatus};
use crate::store::{Record, StoreError, Table};

impl Record for Ride {
    fn key(&self) -> Uuid {
        self.ride_id
    }
}

impl Record for RideApplication {
    fn key(&self) -> Uuid {
        self.application_id
    }
}

impl Record for Rating {
    fn key(&self) -> Uuid {
        self.rating_id
    }
}

/// Named accessors over the ride, application and rating tables. No business
/// rules live here.
pub struct Repository {
    rides: Table<Ride>,
    applications: Table<RideApplication>,
    ratings: Table<Rating>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        Self {
            rides: Table::new("rides"),
            applications: Table::new("ride_applications"),
            ratings: Table::new("ride_ratings"),
        }
    }

    pub fn ride_count(&self) -> usize {
        self.rides.len()
    }

    pub fn application_count(&self) -> usize {
        self.applications.len()
    }

    pub fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    pub fn create_ride(&self, ride: Ride) -> Result<Ride, StoreError> {
        self.rides.insert(ride)
    }

    pub fn get_ride(&self, ride_id: Uuid) -> Option<Ride> {
        self.rides.get(&ride_id)
    }

    pub fn contains_ride(&self, ride_id: Uuid) -> bool {
        self.rides.contains(&ride_id)
    }

    pub fn rides_by_status(&self, status: RideStatus) -> Vec<Ride> {
        self.rides.select(|ride| ride.status == status)
    }

    /// Rides where the user is the rider, the assigned driver, or the driver
    /// detached by a cancellation.
    pub fn rides_for_user(&self, user_id: Uuid) -> Vec<Ride> {
        self.rides.select(|ride| {
            ride.user_id == user_id
                || ride.driver_id == Some(user_id)
                || ride.cancelled_driver_id == Some(user_id)
        })
    }

    pub fn update_ride<F>(&self, ride_id: Uuid, patch: F) -> Option<Ride>
    where
        F: FnOnce(&mut Ride),
    {
        self.rides.update(&ride_id, patch)
    }

    pub fn create_application(
        &self,
        application: RideApplication,
    ) -> Result<RideApplication, StoreError> {
        self.applications.insert(application)
    }

    pub fn find_application(&self, ride_id: Uuid, driver_id: Uuid) -> Option<RideApplication> {
        self.applications
            .find(|app| app.ride_id == ride_id && app.driver_id == driver_id)
    }

    pub fn applications_for_ride(&self, ride_id: Uuid) -> Vec<RideApplication> {
        self.applications.select(|app| app.ride_id == ride_id)
    }

    pub fn create_rating(&self, rating: Rating) -> Result<Rating, StoreError> {
        self.ratings.insert(rating)
    }

    pub fn find_rating(&self, ride_id: Uuid, rater_id: Uuid) -> Option<Rating> {
        self.ratings
            .find(|rating| rating.ride_id == ride_id && rating.rater_id == rater_id)
    }

    pub fn ratings_for_ride(&self, ride_id: Uuid) -> Vec<Rating> {
        self.ratings.select(|rating| rating.ride_id == ride_id)
    }

    /// Ratings a user received from the given kind of rater.
    pub fn ratings_received(&self, user_id: Uuid, from: RaterType) -> Vec<Rating> {
        self.ratings
            .select(|rating| rating.rated_user_id == user_id && rating.rater_type == from)
    }
}

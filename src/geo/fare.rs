use tracing::warn;

use crate::geo::great_circle_distance_km;
use crate::models::location::Coordinates;

pub const BASE_FARE: f64 = 50.00;
pub const RATE_PER_KM: f64 = 15.00;

/// `BASE_FARE + RATE_PER_KM * distance`, rounded to cents. Malformed
/// coordinates fall back to the base fare.
pub fn calculate_fare(pickup: &Coordinates, drop: &Coordinates) -> f64 {
    match great_circle_distance_km(pickup, drop) {
        Ok(distance_km) => round_cents(BASE_FARE + RATE_PER_KM * distance_km),
        Err(err) => {
            warn!(error = %err, "fare distance unavailable; charging base fare");
            BASE_FARE
        }
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{BASE_FARE, RATE_PER_KM, calculate_fare, round_cents};
    use crate::geo::haversine_km;
    use crate::models::location::Coordinates;

    #[test]
    fn fare_follows_distance_formula() {
        let pickup = Coordinates {
            latitude: 23.8103,
            longitude: 90.4125,
        };
        let drop = Coordinates {
            latitude: 23.7805,
            longitude: 90.2792,
        };

        let expected = round_cents(BASE_FARE + RATE_PER_KM * haversine_km(&pickup, &drop));
        let fare = calculate_fare(&pickup, &drop);

        assert_eq!(fare, expected);
        assert_eq!(fare, 259.42);
    }

    #[test]
    fn same_point_costs_base_fare() {
        let p = Coordinates {
            latitude: 1.0,
            longitude: 1.0,
        };
        assert_eq!(calculate_fare(&p, &p), BASE_FARE);
    }

    #[test]
    fn malformed_coordinates_fall_back_to_base_fare() {
        let pickup = Coordinates {
            latitude: f64::INFINITY,
            longitude: 0.0,
        };
        let drop = Coordinates {
            latitude: 10.0,
            longitude: 10.0,
        };
        assert_eq!(calculate_fare(&pickup, &drop), BASE_FARE);
    }
}

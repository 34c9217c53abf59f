pub mod fare;
pub mod location;

use thiserror::Error;

use crate::models::location::Coordinates;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Error, PartialEq)]
#[error("malformed coordinates: ({latitude}, {longitude})")]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lng = b.longitude.to_radians() - a.longitude.to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Great-circle distance that rejects non-finite or out-of-range input.
pub fn great_circle_distance_km(
    a: &Coordinates,
    b: &Coordinates,
) -> Result<f64, InvalidCoordinates> {
    for point in [a, b] {
        if !point.is_valid() {
            return Err(InvalidCoordinates {
                latitude: point.latitude,
                longitude: point.longitude,
            });
        }
    }

    Ok(haversine_km(a, b))
}

#[cfg(test)]
mod tests {
    use super::{great_circle_distance_km, haversine_km};
    use crate::models::location::Coordinates;

    fn point(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = point(23.8103, 90.4125);
        assert!(haversine_km(&p, &p) < 1e-9);
    }

    #[test]
    fn dhaka_crossing_is_around_14_km() {
        let pickup = point(23.8103, 90.4125);
        let drop = point(23.7805, 90.2792);
        let distance = haversine_km(&pickup, &drop);
        assert!((distance - 13.9612).abs() < 1e-3, "got {distance}");
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let err = great_circle_distance_km(&point(91.0, 0.0), &point(0.0, 0.0)).unwrap_err();
        assert_eq!(err.latitude, 91.0);
    }

    #[test]
    fn nan_longitude_is_rejected() {
        assert!(great_circle_distance_km(&point(0.0, 0.0), &point(0.0, f64::NAN)).is_err());
    }
}

use crate::models::location::Location;

/// Serializes a location snapshot the way application records store it.
pub fn format_location(latitude: f64, longitude: f64, address: Option<&str>) -> String {
    let location = Location {
        latitude,
        longitude,
        address: address
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string),
    };

    serde_json::to_string(&location).unwrap_or_else(|_| "{}".to_string())
}

/// Parses a stored snapshot; unreadable input degrades to the origin.
pub fn parse_location(raw: &str) -> Location {
    serde_json::from_str(raw).unwrap_or_default()
}

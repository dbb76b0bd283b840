use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earth's mean radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's mean radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

pub const MILE_TO_METERS: f64 = 1609.34;

pub const DEFAULT_SEARCH_RADIUS_MILES: f64 = 10.0;

/// Default local search radius (10 miles)
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = DEFAULT_SEARCH_RADIUS_MILES * 1.60934;

/// Unit for distance results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    #[serde(rename = "km")]
    Km,
    #[serde(rename = "miles", alias = "mi")]
    Miles,
}

impl DistanceUnit {
    #[inline]
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Km => EARTH_RADIUS_KM,
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Km => write!(f, "km"),
            DistanceUnit::Miles => write!(f, "miles"),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "km" => Ok(DistanceUnit::Km),
            "miles" | "mi" => Ok(DistanceUnit::Miles),
            other => Err(format!("unknown distance unit '{}', expected km or miles", other)),
        }
    }
}

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance_in(lat1, lon1, lat2, lon2, DistanceUnit::Km)
}

/// Calculate the Haversine distance between two points in the requested unit
#[inline]
pub fn haversine_distance_in(
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    unit: DistanceUnit,
) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    unit.earth_radius() * c
}

/// Convert kilometers to meters (the data store's radius unit)
#[inline]
pub fn km_to_meters(km: f64) -> f64 {
    km * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // Distance from London to Paris (approximately 344 km)
        let london_lat = 51.5074;
        let london_lon = -0.1278;
        let paris_lat = 48.8566;
        let paris_lon = 2.3522;

        let distance = haversine_distance(london_lat, london_lon, paris_lat, paris_lon);
        assert!((distance - 344.0).abs() < 10.0, "Distance should be ~344km, got {}", distance);
    }

    #[test]
    fn test_identical_points() {
        assert_eq!(haversine_distance(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(haversine_distance(53.8008, -1.5491, 53.8008, -1.5491), 0.0);
    }

    #[test]
    fn test_half_circumference_at_equator() {
        let distance = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!((distance - 20015.1).abs() < 0.1, "got {}", distance);
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_miles_uses_mile_radius() {
        let km = haversine_distance_in(51.5074, -0.1278, 48.8566, 2.3522, DistanceUnit::Km);
        let miles = haversine_distance_in(51.5074, -0.1278, 48.8566, 2.3522, DistanceUnit::Miles);
        let ratio = km / miles;
        assert!((ratio - EARTH_RADIUS_KM / EARTH_RADIUS_MILES).abs() < 1e-9);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Km);
        assert_eq!("Miles".parse::<DistanceUnit>().unwrap(), DistanceUnit::Miles);
        assert_eq!("mi".parse::<DistanceUnit>().unwrap(), DistanceUnit::Miles);
        assert!("furlongs".parse::<DistanceUnit>().is_err());
        assert_eq!(DistanceUnit::default(), DistanceUnit::Km);
        assert_eq!(DistanceUnit::Miles.to_string(), "miles");
    }

    #[test]
    fn test_default_radius() {
        assert!((DEFAULT_SEARCH_RADIUS_KM - 16.0934).abs() < 1e-9);
        assert_eq!(km_to_meters(2.5), 2500.0);
    }
}

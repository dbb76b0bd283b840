//! Event Radar - geo-filtered event discovery service
//!
//! This library provides the distance math and the filter engine behind the
//! Event Radar app: text, tag, date and radius filters over events, ranking,
//! tag-similarity recommendations and the HTTP surface around them.

pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{GeoFilterEngine, Recommender, distance::{haversine_distance, DistanceUnit}};
pub use crate::models::{Coordinate, DateRange, Event, FilterCriteria, RankMode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let km = haversine_distance(53.8008, -1.5491, 53.8008, -1.5491);
        assert_eq!(km, 0.0);
        assert!(FilterCriteria::default().is_empty());
    }
}

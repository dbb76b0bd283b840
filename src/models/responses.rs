use serde::{Deserialize, Serialize};

use crate::core::distance::DistanceUnit;
use crate::models::domain::{Coordinate, Event, PlacePrediction};

/// Response for search, filter and recommendation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total_results: usize,
    /// Origin the search was centered on, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinate>,
    /// Unique tags across the candidate events, for the tag picker
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Distance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceResponse {
    pub distance: f64,
    pub unit: DistanceUnit,
}

/// Autocomplete response; `superseded` means a newer request from the same
/// session replaced this one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub predictions: Vec<PlacePrediction>,
    pub superseded: bool,
}

/// Event mutation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMutationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}

/// Reverse geocoding response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseGeocodeResponse {
    pub address: String,
}

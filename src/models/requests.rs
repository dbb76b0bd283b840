use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::distance::DistanceUnit;
use crate::models::domain::{parse_event_time, Coordinate, DateRange, Event, FilterCriteria, RankMode};

/// Maximum number of tags on one event
pub const MAX_EVENT_TAGS: usize = 8;

/// Search events around an origin
///
/// The origin comes from `latitude`/`longitude` (device location), or from
/// `address` via the geocoder; when neither is set the configured default
/// city is used for the fetch and no radius filter is applied.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchEventsRequest {
    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(rename = "searchText", default)]
    pub search_text: String,
    #[serde(rename = "selectedTags", default)]
    pub selected_tags: Vec<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "radiusKm", default)]
    #[validate(range(exclusive_min = 0.0))]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub rank: RankMode,
    #[serde(rename = "profileId", default)]
    pub profile_id: Option<String>,
}

impl SearchEventsRequest {
    /// Device origin, when both coordinates were sent
    pub fn device_origin(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    /// Build criteria for the filter engine
    pub fn criteria(&self, origin: Option<Coordinate>, default_radius_km: f64) -> FilterCriteria {
        let date_range = if self.start_date.is_some() || self.end_date.is_some() {
            Some(DateRange::new(self.start_date, self.end_date))
        } else {
            None
        };

        FilterCriteria {
            search_text: self.search_text.clone(),
            selected_tags: self.selected_tags.iter().cloned().collect(),
            date_range,
            origin,
            radius_km: self.radius_km.unwrap_or(default_radius_km),
        }
    }
}

/// Filter a caller-supplied event list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEventsRequest {
    pub events: Vec<Event>,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub rank: RankMode,
}

/// Distance query parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DistanceQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat1: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon1: f64,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat2: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon2: f64,
    #[serde(default)]
    pub unit: DistanceUnit,
}

/// Autocomplete query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteQuery {
    pub input: String,
    #[serde(default)]
    pub session: Option<String>,
}

/// Reverse geocoding query parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReverseGeocodeQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

/// Create an event
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    #[validate(custom(function = "validate_time"))]
    pub time: String,
    #[serde(default)]
    pub image: Option<String>,
    #[validate(custom(function = "validate_position"))]
    pub position: Coordinate,
    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

/// Partial update of an event
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom(function = "validate_time"))]
    pub time: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_position"))]
    pub position: Option<Coordinate>,
    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
}

fn validate_position(position: &Coordinate) -> Result<(), ValidationError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_coordinate"))
    }
}

fn validate_time(time: &str) -> Result<(), ValidationError> {
    match parse_event_time(time) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("invalid_time")),
    }
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if normalize_tags(tags).len() > MAX_EVENT_TAGS {
        return Err(ValidationError::new("too_many_tags"));
    }
    Ok(())
}

/// Trim, lower-case and deduplicate tags, dropping empty ones
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateEventRequest {
        CreateEventRequest {
            title: "Jazz Night".to_string(),
            description: String::new(),
            location: "Leeds".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 5, 10).unwrap(),
            time: "20:00".to_string(),
            image: None,
            position: Coordinate::new(53.8013, -1.5486),
            tags: vec!["Music".to_string(), " music ".to_string(), "jazz".to_string()],
        }
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec!["Music".to_string(), " music ".to_string(), "".to_string(), "Jazz".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["music", "jazz"]);
    }

    #[test]
    fn test_create_request_valid() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_too_many_tags() {
        let mut request = create_request();
        request.tags = (0..9).map(|i| format!("tag{}", i)).collect();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_rejects_bad_position() {
        let mut request = create_request();
        request.position = Coordinate::new(120.0, 0.0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_event_time_must_be_hh_mm() {
        let mut request = create_request();
        request.time = "25:99".to_string();
        assert!(request.validate().is_err());

        request.time = String::new();
        assert!(request.validate().is_ok());

        let update = UpdateEventRequest {
            time: Some("8pm".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateEventRequest {
            time: Some("20:00".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_search_request_criteria() {
        let json = r#"{"searchText":"jazz","selectedTags":["music"],"startDate":"2026-01-01"}"#;
        let request: SearchEventsRequest = serde_json::from_str(json).unwrap();
        let criteria = request.criteria(Some(Coordinate::new(53.8, -1.55)), 16.0);

        assert_eq!(criteria.search_text, "jazz");
        assert!(criteria.selected_tags.contains("music"));
        assert_eq!(criteria.radius_km, 16.0);
        assert!(criteria.date_range.unwrap().end.is_none());
        assert!(request.device_origin().is_none());
    }
}

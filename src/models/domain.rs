use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::distance::{haversine_distance_in, DistanceUnit, DEFAULT_SEARCH_RADIUS_KM};

/// Geographic point in degrees, serialized as `[lat, lon]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and within the lat/lon ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to another point
    #[inline]
    pub fn distance_to(&self, other: &Coordinate, unit: DistanceUnit) -> f64 {
        haversine_distance_in(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
            unit,
        )
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        [value.latitude, value.longitude]
    }
}

/// Event as consumed by the filter engine and returned by the API
///
/// One record carries every optional field; entries coming from the
/// recommendation path have `score` set, plain geo lookups do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub position: Option<Coordinate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(rename = "interestCount", default, skip_serializing_if = "Option::is_none")]
    pub interest_count: Option<u32>,
    #[serde(rename = "isUserInterested", default, skip_serializing_if = "Option::is_none")]
    pub is_user_interested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Event {
    /// Minimal event with only the required fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            location: String::new(),
            date,
            time: String::new(),
            image: None,
            position: None,
            tags: Vec::new(),
            owner_id: None,
            interest_count: None,
            is_user_interested: None,
            score: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Distance in km from `origin`; `None` unless both points are valid
    pub fn distance_km_from(&self, origin: &Coordinate) -> Option<f64> {
        self.position
            .filter(|position| position.is_valid() && origin.is_valid())
            .map(|position| origin.distance_to(&position, DistanceUnit::Km))
    }
}

/// Parse an event time: `HH:MM`, or empty for midnight
pub fn parse_event_time(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    if time.is_empty() {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

/// Inclusive date bounds; either side may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Filter criteria for a single filter pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(rename = "searchText", default)]
    pub search_text: String,
    #[serde(rename = "selectedTags", default)]
    pub selected_tags: BTreeSet<String>,
    #[serde(rename = "dateRange", default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub origin: Option<Coordinate>,
    #[serde(rename = "radiusKm", default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    DEFAULT_SEARCH_RADIUS_KM
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            selected_tags: BTreeSet::new(),
            date_range: None,
            origin: None,
            radius_km: default_radius_km(),
        }
    }
}

impl FilterCriteria {
    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_origin(mut self, origin: Coordinate, radius_km: f64) -> Self {
        self.origin = Some(origin);
        self.radius_km = radius_km;
        self
    }

    /// True when no predicate restricts the input
    pub fn is_empty(&self) -> bool {
        self.search_text.is_empty()
            && self.selected_tags.is_empty()
            && self.date_range.map_or(true, |r| r.start.is_none() && r.end.is_none())
            && self.origin.is_none()
    }
}

/// Ordering applied after filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMode {
    /// Keep input order
    #[default]
    #[serde(rename = "input")]
    InputOrder,
    /// Nearest to the origin first
    #[serde(rename = "distance")]
    Distance,
    /// Highest recommendation score first
    #[serde(rename = "score")]
    Score,
}

/// Place suggestion returned by the autocomplete provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePrediction {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub description: String,
}

/// Recommendation tuning
#[derive(Debug, Clone, Copy)]
pub struct RecommendParams {
    pub threshold: f64,
    pub limit: usize,
}

impl Default for RecommendParams {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            limit: 10,
        }
    }
}

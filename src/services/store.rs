use crate::core::distance::km_to_meters;
use crate::models::{parse_event_time, Coordinate, Event};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with the data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Table and RPC names in the data store
#[derive(Debug, Clone)]
pub struct StoreTables {
    pub events: String,
    pub event_tags: String,
    pub profile_tags: String,
    pub near_events_rpc: String,
}

impl Default for StoreTables {
    fn default() -> Self {
        Self {
            events: "events".to_string(),
            event_tags: "event_tags".to_string(),
            profile_tags: "profile_tags".to_string(),
            near_events_rpc: "get_events_with_interest".to_string(),
        }
    }
}

/// Event row as stored by the backend
///
/// The near-point RPC returns `event_time`, the plain table `timestamp`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(alias = "timestamp")]
    pub event_time: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub interest_count: Option<u32>,
    #[serde(default)]
    pub user_interested: Option<bool>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Row payload for inserts and updates
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventRowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl EventRowPatch {
    /// Full row for a new event
    pub fn from_event(event: &Event) -> Result<Self, StoreError> {
        let timestamp = format_timestamp(event.date, &event.time)
            .ok_or_else(|| StoreError::InvalidEvent(format!("Bad time '{}'", event.time)))?;

        Ok(Self {
            name: Some(event.title.clone()),
            description: Some(event.description.clone()),
            location: Some(event.location.clone()),
            timestamp: Some(timestamp),
            image_url: event.image.clone(),
            latitude: event.position.map(|p| p.latitude),
            longitude: event.position.map(|p| p.longitude),
            owner_id: event.owner_id.clone(),
        })
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {}", other))),
    }
}

/// Parse a backend timestamp (RFC 3339, or naive and taken as UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Combine a date and an `HH:MM` time into a UTC timestamp string
///
/// Returns `None` when `time` is neither empty nor a valid `HH:MM`.
pub fn format_timestamp(date: NaiveDate, time: &str) -> Option<String> {
    parse_event_time(time).map(|time| date.and_time(time).and_utc().to_rfc3339())
}

impl EventRow {
    /// Map a stored row into an `Event`
    pub fn into_event(self) -> Result<Event, StoreError> {
        let ts = parse_timestamp(&self.event_time).ok_or_else(|| {
            StoreError::InvalidResponse(format!("Bad timestamp '{}' on event {}", self.event_time, self.id))
        })?;

        let position = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };

        Ok(Event {
            id: self.id,
            title: self.name,
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            date: ts.date_naive(),
            time: ts.format("%H:%M").to_string(),
            image: self.image_url,
            position,
            tags: self.tags.unwrap_or_default(),
            owner_id: self.owner_id,
            interest_count: self.interest_count,
            is_user_interested: self.user_interested,
            score: None,
        })
    }
}

/// Data store REST client
///
/// Handles all communication with the hosted backend including:
/// - Fetching events near a point (with fetch-all fallback)
/// - Inserting, updating and deleting events
/// - Reading profile and event tags for recommendations
pub struct StoreClient {
    base_url: String,
    api_key: String,
    client: Client,
    tables: StoreTables,
}

impl StoreClient {
    /// Create a new data store client
    pub fn new(base_url: String, api_key: String, tables: StoreTables) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            tables,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response, action: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::error!("Failed to {}: {} - {}", action, status, body);
        Err(StoreError::ApiError(format!("Failed to {}: {}", action, status)))
    }

    fn rows_to_events(rows: Vec<EventRow>) -> Vec<Event> {
        rows.into_iter()
            .filter_map(|row| match row.into_event() {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping malformed event row: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Fetch events within `radius_meters` of `origin`
    pub async fn fetch_events_near(
        &self,
        origin: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<Event>, StoreError> {
        let url = self.rest_url(&format!("rpc/{}", self.tables.near_events_rpc));

        tracing::debug!(
            "Fetching events near ({}, {}) within {}m",
            origin.latitude,
            origin.longitude,
            radius_meters
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({
                "lat": origin.latitude,
                "lng": origin.longitude,
                "radius_meters": radius_meters,
            }))
            .send()
            .await?;
        let response = Self::check(response, "fetch events near point").await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse events: {}", e)))?;

        Ok(Self::rows_to_events(rows))
    }

    /// Fetch every event
    pub async fn fetch_all_events(&self) -> Result<Vec<Event>, StoreError> {
        let url = format!("{}?select=*", self.rest_url(&self.tables.events));

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, "fetch events").await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse events: {}", e)))?;

        Ok(Self::rows_to_events(rows))
    }

    /// Fetch events near a point, falling back to all events if the near
    /// query fails
    pub async fn fetch_events(&self, origin: Coordinate, radius_km: f64) -> Result<Vec<Event>, StoreError> {
        match self.fetch_events_near(origin, km_to_meters(radius_km)).await {
            Ok(events) => Ok(events),
            Err(e) => {
                tracing::warn!("Near-point query failed, falling back to all events: {}", e);
                self.fetch_all_events().await
            }
        }
    }

    /// Get a single event by id
    pub async fn get_event(&self, event_id: &str) -> Result<Event, StoreError> {
        let url = format!(
            "{}?id=eq.{}&select=*",
            self.rest_url(&self.tables.events),
            urlencoding::encode(event_id)
        );

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, "fetch event").await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse event: {}", e)))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("Event {} not found", event_id)))?
            .into_event()
    }

    /// Insert an event and its tags, returning the stored event
    pub async fn insert_event(&self, event: &Event) -> Result<Event, StoreError> {
        let url = self.rest_url(&self.tables.events);
        let payload = EventRowPatch::from_event(event)?;

        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(&[payload])
            .send()
            .await?;
        let response = Self::check(response, "insert event").await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse inserted event: {}", e)))?;
        let mut stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("Insert returned no rows".into()))?
            .into_event()?;

        if !event.tags.is_empty() {
            self.replace_event_tags(&stored.id, &event.tags).await?;
        }
        stored.tags = event.tags.clone();

        tracing::info!("Inserted event {} ({})", stored.id, stored.title);
        Ok(stored)
    }

    /// Apply a partial update, returning the stored event
    pub async fn update_event(
        &self,
        event_id: &str,
        patch: &EventRowPatch,
        tags: Option<&[String]>,
    ) -> Result<Event, StoreError> {
        let url = format!(
            "{}?id=eq.{}",
            self.rest_url(&self.tables.events),
            urlencoding::encode(event_id)
        );

        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let response = Self::check(response, "update event").await?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse updated event: {}", e)))?;
        let mut stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("Event {} not found", event_id)))?
            .into_event()?;

        if let Some(tags) = tags {
            self.replace_event_tags(event_id, tags).await?;
            stored.tags = tags.to_vec();
        }

        tracing::debug!("Updated event {}", event_id);
        Ok(stored)
    }

    /// Delete an event; returns false when nothing was deleted
    pub async fn delete_event(&self, event_id: &str) -> Result<bool, StoreError> {
        let url = format!(
            "{}?id=eq.{}",
            self.rest_url(&self.tables.events),
            urlencoding::encode(event_id)
        );

        let response = self
            .authorized(self.client.delete(&url))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = Self::check(response, "delete event").await?;

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse deleted rows: {}", e)))?;
        tracing::info!("Deleted event {} ({} rows)", event_id, rows.len());
        Ok(!rows.is_empty())
    }

    async fn replace_event_tags(&self, event_id: &str, tags: &[String]) -> Result<(), StoreError> {
        let url = self.rest_url(&self.tables.event_tags);

        let response = self
            .authorized(self.client.delete(format!("{}?event_id=eq.{}", url, urlencoding::encode(event_id))))
            .send()
            .await?;
        Self::check(response, "clear event tags").await?;

        if tags.is_empty() {
            return Ok(());
        }

        let rows: Vec<Value> = tags
            .iter()
            .map(|tag| json!({ "event_id": event_id, "tag_name": tag }))
            .collect();
        let response = self.authorized(self.client.post(&url)).json(&rows).send().await?;
        Self::check(response, "insert event tags").await?;

        Ok(())
    }

    /// Tags a profile is interested in
    pub async fn fetch_profile_tags(&self, profile_id: &str) -> Result<Vec<String>, StoreError> {
        let url = format!(
            "{}?profile_id=eq.{}&select=tag_name",
            self.rest_url(&self.tables.profile_tags),
            urlencoding::encode(profile_id)
        );

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, "fetch profile tags").await?;

        let rows: Vec<TagRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse profile tags: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.tag_name).collect())
    }

    /// All (event id, tag) pairs
    pub async fn fetch_event_tags(&self) -> Result<Vec<(String, String)>, StoreError> {
        let url = format!("{}?select=event_id,tag_name", self.rest_url(&self.tables.event_tags));

        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = Self::check(response, "fetch event tags").await?;

        let rows: Vec<EventTagRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse event tags: {}", e)))?;

        Ok(rows.into_iter().map(|row| (row.event_id, row.tag_name)).collect())
    }

    /// All events with tags taken from the tag table
    pub async fn fetch_tagged_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.fetch_all_events().await?;
        let pairs = self.fetch_event_tags().await?;

        let mut by_event: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
        for (event_id, tag) in pairs {
            by_event.entry(event_id).or_default().push(tag);
        }

        for event in &mut events {
            if let Some(tags) = by_event.remove(&event.id) {
                event.tags = tags;
            }
        }

        Ok(events)
    }
}

#[derive(Debug, Deserialize)]
struct TagRow {
    tag_name: String,
}

#[derive(Debug, Deserialize)]
struct EventTagRow {
    #[serde(deserialize_with = "id_as_string")]
    event_id: String,
    tag_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_client_creation() {
        let client = StoreClient::new(
            "https://store.test/".to_string(),
            "test_key".to_string(),
            StoreTables::default(),
        )
        .unwrap();

        assert_eq!(client.rest_url("events"), "https://store.test/rest/v1/events");
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_row_mapping() {
        let row: EventRow = serde_json::from_value(json!({
            "id": 42,
            "name": "Jazz Night",
            "description": null,
            "location": "Leeds",
            "event_time": "2026-05-10T20:30:00+00:00",
            "latitude": 53.8013,
            "longitude": -1.5486,
            "tags": ["music"],
            "interest_count": 3,
            "user_interested": false
        }))
        .unwrap();

        let event = row.into_event().unwrap();
        assert_eq!(event.id, "42");
        assert_eq!(event.title, "Jazz Night");
        assert_eq!(event.description, "");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2026, 5, 10).unwrap());
        assert_eq!(event.time, "20:30");
        assert_eq!(event.position, Some(Coordinate::new(53.8013, -1.5486)));
        assert_eq!(event.interest_count, Some(3));
    }

    #[test]
    fn test_row_mapping_timestamp_alias_and_missing_position() {
        let row: EventRow = serde_json::from_value(json!({
            "id": "abc",
            "name": "Food Fair",
            "timestamp": "2026-07-01 09:00:00",
            "latitude": 51.5
        }))
        .unwrap();

        let event = row.into_event().unwrap();
        assert_eq!(event.time, "09:00");
        assert!(event.position.is_none());
        assert!(event.tags.is_empty());
    }

    #[test]
    fn test_bad_timestamp_is_invalid() {
        let row: EventRow = serde_json::from_value(json!({
            "id": 1,
            "name": "Broken",
            "event_time": "next tuesday"
        }))
        .unwrap();
        assert!(matches!(row.into_event(), Err(StoreError::InvalidResponse(_))));
    }

    #[test]
    fn test_format_timestamp() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        assert_eq!(format_timestamp(date, "20:30").as_deref(), Some("2026-05-10T20:30:00+00:00"));
        assert_eq!(format_timestamp(date, "").as_deref(), Some("2026-05-10T00:00:00+00:00"));
    }

    #[test]
    fn test_format_timestamp_rejects_bad_time() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        assert_eq!(format_timestamp(date, "25:99"), None);
        assert_eq!(format_timestamp(date, "evening"), None);

        let mut event = Event::new("", "Jazz Night", date);
        event.time = "25:99".to_string();
        assert!(matches!(EventRowPatch::from_event(&event), Err(StoreError::InvalidEvent(_))));
    }
}

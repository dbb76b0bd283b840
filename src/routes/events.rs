use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::auth::{AuthUser, TokenVerifier};
use crate::config::SearchSettings;
use crate::core::{collect_tags, haversine_distance_in, merge_streams, Debouncer, GeoFilterEngine, Recommender};
use crate::models::{
    normalize_tags, Coordinate, CreateEventRequest, DistanceQuery, DistanceResponse, ErrorResponse,
    Event, EventMutationResponse, EventsResponse, FilterEventsRequest, HealthResponse,
    SearchEventsRequest, UpdateEventRequest,
};
use crate::services::{CacheKey, CacheManager, EventRowPatch, GeocodeClient, GeocodeError, StoreClient, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StoreClient>,
    pub geocoder: Arc<GeocodeClient>,
    pub cache: Arc<CacheManager>,
    pub engine: GeoFilterEngine,
    pub recommender: Arc<Recommender>,
    pub verifier: Option<Arc<TokenVerifier>>,
    pub search: SearchSettings,
    /// One debouncer per autocomplete session
    pub debouncers: moka::future::Cache<String, Debouncer>,
    pub debounce_delay: std::time::Duration,
}

/// Configure all event-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/distance", web::get().to(distance))
        .route("/events/test", web::get().to(test_connection))
        .route("/events/search", web::post().to(search_events))
        .route("/events/filter", web::post().to(filter_events))
        .route("/events/recommended/{profile_id}", web::get().to(recommended_events))
        .route("/events", web::post().to(create_event))
        .route("/events/{event_id}", web::patch().to(update_event))
        .route("/events/{event_id}", web::delete().to(delete_event));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Upstream store failures are retryable from the client's point of view
fn store_error_response(e: &StoreError, error: &str) -> HttpResponse {
    match e {
        StoreError::NotFound(_) => {
            error_response(actix_web::http::StatusCode::NOT_FOUND, error, e.to_string())
        }
        StoreError::InvalidEvent(_) => {
            error_response(actix_web::http::StatusCode::BAD_REQUEST, error, e.to_string())
        }
        _ => error_response(actix_web::http::StatusCode::BAD_GATEWAY, error, e.to_string()),
    }
}

fn authenticate(state: &AppState, req: &HttpRequest) -> Result<AuthUser, HttpResponse> {
    let verifier = state.verifier.as_ref().ok_or_else(|| {
        error_response(
            actix_web::http::StatusCode::UNAUTHORIZED,
            "Authentication unavailable",
            "No token secret is configured".to_string(),
        )
    })?;

    verifier.from_request(req).map_err(|e| {
        tracing::info!("Rejected request to {}: {}", req.path(), e);
        error_response(actix_web::http::StatusCode::UNAUTHORIZED, "Unauthorized", e.to_string())
    })
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Reachability probe
async fn test_connection() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Backend is reachable",
    }))
}

/// Distance between two points
///
/// GET /api/v1/distance?lat1=..&lon1=..&lat2=..&lon2=..&unit=km|miles
async fn distance(query: web::Query<DistanceQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let distance = haversine_distance_in(query.lat1, query.lon1, query.lat2, query.lon2, query.unit);
    HttpResponse::Ok().json(DistanceResponse {
        distance,
        unit: query.unit,
    })
}

/// Events near `center`, served from cache when possible
async fn events_near(state: &AppState, center: Coordinate) -> Result<Vec<Event>, StoreError> {
    let radius_km = state.search.fetch_radius_km;
    let cache_key = CacheKey::events_near(&center, radius_km);

    match state.cache.get::<Vec<Event>>(&cache_key).await {
        Ok(events) => return Ok(events),
        Err(crate::services::CacheError::CacheMiss(_)) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", cache_key, e),
    }

    let events = state.store.fetch_events(center, radius_km).await?;
    if let Err(e) = state.cache.set(&cache_key, &events).await {
        tracing::warn!("Failed to cache {}: {}", cache_key, e);
    }

    Ok(events)
}

/// Recommended events for a profile, served from cache when possible
async fn recommended_for(state: &AppState, profile_id: &str) -> Result<Vec<Event>, StoreError> {
    let cache_key = CacheKey::recommended(profile_id);
    if let Ok(events) = state.cache.get::<Vec<Event>>(&cache_key).await {
        return Ok(events);
    }

    let tags_key = CacheKey::profile_tags(profile_id);
    let profile_tags = match state.cache.get::<Vec<String>>(&tags_key).await {
        Ok(tags) => tags,
        Err(_) => {
            let tags = state.store.fetch_profile_tags(profile_id).await?;
            if let Err(e) = state.cache.set(&tags_key, &tags).await {
                tracing::warn!("Failed to cache {}: {}", tags_key, e);
            }
            tags
        }
    };
    if profile_tags.is_empty() {
        tracing::debug!("No tags found for profile {}", profile_id);
        return Ok(Vec::new());
    }

    let events = state.store.fetch_tagged_events().await?;
    let recommended = state.recommender.recommend(&profile_tags, events);

    if let Err(e) = state.cache.set(&cache_key, &recommended).await {
        tracing::warn!("Failed to cache {}: {}", cache_key, e);
    }

    Ok(recommended)
}

/// Search events endpoint
///
/// POST /api/v1/events/search
///
/// Request body:
/// ```json
/// {
///   "latitude": 53.8008,
///   "longitude": -1.5491,
///   "searchText": "jazz",
///   "selectedTags": ["music"],
///   "startDate": "2026-05-01",
///   "endDate": "2026-05-31",
///   "radiusKm": 10,
///   "rank": "distance",
///   "profileId": "string"
/// }
/// ```
async fn search_events(
    state: web::Data<AppState>,
    req: web::Json<SearchEventsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for search request: {:?}", errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    // Device location first, then a typed address
    let origin = match (req.device_origin(), req.address.as_deref().map(str::trim)) {
        (Some(origin), _) => Some(origin),
        (None, Some(address)) if !address.is_empty() => match state.geocoder.geocode(address).await {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::warn!("Failed to geocode '{}': {}", address, e);
                let status = match e {
                    GeocodeError::ZeroResults(_) => actix_web::http::StatusCode::NOT_FOUND,
                    _ => actix_web::http::StatusCode::BAD_GATEWAY,
                };
                return error_response(status, "Failed to resolve address", e.to_string());
            }
        },
        _ => None,
    };

    let center = origin.unwrap_or_else(|| state.search.default_origin());

    let mut events = match events_near(&state, center).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("Failed to fetch events near ({}, {}): {}", center.latitude, center.longitude, e);
            return store_error_response(&e, "Failed to fetch events");
        }
    };

    if let Some(profile_id) = req.profile_id.as_deref() {
        match recommended_for(&state, profile_id).await {
            Ok(suggested) => events = merge_streams(events, suggested),
            Err(e) => tracing::warn!("Skipping recommendations for {}: {}", profile_id, e),
        }
    }

    let criteria = req.criteria(origin, state.search.default_radius_km);
    let tags = collect_tags(&events);
    let outcome = state.engine.filter(&events, &criteria, req.rank);

    tracing::info!(
        "Returning {} events (from {} candidates)",
        outcome.events.len(),
        outcome.total_candidates
    );

    HttpResponse::Ok().json(EventsResponse {
        events: outcome.events,
        total_results: outcome.total_candidates,
        origin,
        tags,
    })
}

/// Filter a caller-supplied list
///
/// POST /api/v1/events/filter
async fn filter_events(
    state: web::Data<AppState>,
    req: web::Json<FilterEventsRequest>,
) -> impl Responder {
    let req = req.into_inner();
    let tags = collect_tags(&req.events);
    let outcome = state.engine.filter(&req.events, &req.criteria, req.rank);

    HttpResponse::Ok().json(EventsResponse {
        events: outcome.events,
        total_results: outcome.total_candidates,
        origin: req.criteria.origin,
        tags,
    })
}

/// Recommended events for a profile
///
/// GET /api/v1/events/recommended/{profile_id}
async fn recommended_events(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let profile_id = path.into_inner();

    match recommended_for(&state, &profile_id).await {
        Ok(events) => {
            let tags = collect_tags(&events);
            HttpResponse::Ok().json(EventsResponse {
                total_results: events.len(),
                events,
                origin: None,
                tags,
            })
        }
        Err(e) => {
            tracing::error!("Failed to build recommendations for {}: {}", profile_id, e);
            store_error_response(&e, "Failed to fetch recommendations")
        }
    }
}

async fn invalidate_event_caches(state: &AppState) {
    for pattern in CacheKey::EVENT_PATTERNS {
        if let Err(e) = state.cache.invalidate_pattern(pattern).await {
            tracing::warn!("Failed to invalidate event cache {}: {}", pattern, e);
        }
    }
}

/// Create an event owned by the caller
///
/// POST /api/v1/events
async fn create_event(
    state: web::Data<AppState>,
    req: web::Json<CreateEventRequest>,
    http_req: HttpRequest,
) -> impl Responder {
    let user = match authenticate(&state, &http_req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    if let Err(errors) = req.validate() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let req = req.into_inner();
    let mut event = Event::new(String::new(), req.title.trim(), req.date);
    event.description = req.description;
    event.location = req.location;
    event.time = req.time;
    event.image = req.image;
    event.position = Some(req.position);
    event.tags = normalize_tags(&req.tags);
    event.owner_id = Some(user.user_id.clone());

    match state.store.insert_event(&event).await {
        Ok(stored) => {
            invalidate_event_caches(&state).await;
            HttpResponse::Created().json(EventMutationResponse {
                success: true,
                event: Some(stored),
            })
        }
        Err(e) => {
            tracing::error!("Failed to create event for {}: {}", user.user_id, e);
            store_error_response(&e, "Failed to create event")
        }
    }
}

/// Load an event and check the caller owns it
async fn owned_event(state: &AppState, user: &AuthUser, event_id: &str) -> Result<Event, HttpResponse> {
    let event = state
        .store
        .get_event(event_id)
        .await
        .map_err(|e| store_error_response(&e, "Failed to fetch event"))?;

    if event.owner_id.as_deref() != Some(user.user_id.as_str()) {
        return Err(error_response(
            actix_web::http::StatusCode::FORBIDDEN,
            "Forbidden",
            format!("Event {} is not owned by the caller", event_id),
        ));
    }

    Ok(event)
}

/// Update an event owned by the caller
///
/// PATCH /api/v1/events/{event_id}
async fn update_event(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<UpdateEventRequest>,
    http_req: HttpRequest,
) -> impl Responder {
    let user = match authenticate(&state, &http_req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    if let Err(errors) = req.validate() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let event_id = path.into_inner();
    let existing = match owned_event(&state, &user, &event_id).await {
        Ok(event) => event,
        Err(response) => return response,
    };

    let req = req.into_inner();
    let timestamp = if req.date.is_some() || req.time.is_some() {
        let date = req.date.unwrap_or(existing.date);
        let time = req.time.clone().unwrap_or_else(|| existing.time.clone());
        match crate::services::store::format_timestamp(date, &time) {
            Some(timestamp) => Some(timestamp),
            None => {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "Validation failed",
                    format!("Invalid time '{}', expected HH:MM", time),
                )
            }
        }
    } else {
        None
    };

    let patch = EventRowPatch {
        name: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        location: req.location,
        timestamp,
        image_url: req.image,
        latitude: req.position.map(|p| p.latitude),
        longitude: req.position.map(|p| p.longitude),
        owner_id: None,
    };
    let tags = req.tags.as_deref().map(normalize_tags);

    match state.store.update_event(&event_id, &patch, tags.as_deref()).await {
        Ok(stored) => {
            invalidate_event_caches(&state).await;
            HttpResponse::Ok().json(EventMutationResponse {
                success: true,
                event: Some(stored),
            })
        }
        Err(e) => {
            tracing::error!("Failed to update event {}: {}", event_id, e);
            store_error_response(&e, "Failed to update event")
        }
    }
}

/// Delete an event owned by the caller
///
/// DELETE /api/v1/events/{event_id}
async fn delete_event(
    state: web::Data<AppState>,
    path: web::Path<String>,
    http_req: HttpRequest,
) -> impl Responder {
    let user = match authenticate(&state, &http_req) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let event_id = path.into_inner();
    if let Err(response) = owned_event(&state, &user, &event_id).await {
        return response;
    }

    match state.store.delete_event(&event_id).await {
        Ok(deleted) => {
            invalidate_event_caches(&state).await;
            HttpResponse::Ok().json(EventMutationResponse {
                success: deleted,
                event: None,
            })
        }
        Err(e) => {
            tracing::error!("Failed to delete event {}: {}", event_id, e);
            store_error_response(&e, "Failed to delete event")
        }
    }
}

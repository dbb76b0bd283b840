// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{parse_event_time, Coordinate, DateRange, Event, FilterCriteria, PlacePrediction, RankMode, RecommendParams};
pub use requests::{
    normalize_tags, AutocompleteQuery, CreateEventRequest, DistanceQuery, FilterEventsRequest,
    ReverseGeocodeQuery, SearchEventsRequest, UpdateEventRequest, MAX_EVENT_TAGS,
};
pub use responses::{
    AutocompleteResponse, DistanceResponse, ErrorResponse, EventMutationResponse, EventsResponse,
    HealthResponse, ReverseGeocodeResponse,
};

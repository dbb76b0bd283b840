// Unit tests for Event Radar

use chrono::NaiveDate;
use event_radar::core::{
    distance::{haversine_distance, haversine_distance_in, km_to_meters, DistanceUnit, DEFAULT_SEARCH_RADIUS_KM},
    filters::{matches_date_range, matches_distance, matches_tags, matches_text},
    dedup_prefer_scored, rank_events, TagSimilarity, TrigramSimilarity,
};
use event_radar::models::{
    normalize_tags, Coordinate, DateRange, Event, FilterCriteria, RankMode, SearchEventsRequest,
};
use std::collections::BTreeSet;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn create_event(id: &str, title: &str) -> Event {
    Event::new(id, title, day(10))
}

#[test]
fn test_haversine_distance_zero() {
    assert_eq!(haversine_distance(0.0, 0.0, 0.0, 0.0), 0.0);
}

#[test]
fn test_haversine_half_equator() {
    let distance = haversine_distance(0.0, 0.0, 0.0, 180.0);
    assert!((distance - 20015.1).abs() < 0.1, "got {}", distance);
}

#[test]
fn test_haversine_leeds_to_london() {
    // Roughly 270 km as the crow flies
    let distance = haversine_distance(53.8008, -1.5491, 51.5074, -0.1278);
    assert!(distance > 260.0 && distance < 285.0, "got {}", distance);
}

#[test]
fn test_haversine_miles() {
    let km = haversine_distance_in(53.8008, -1.5491, 51.5074, -0.1278, DistanceUnit::Km);
    let miles = haversine_distance_in(53.8008, -1.5491, 51.5074, -0.1278, DistanceUnit::Miles);
    assert!((km / miles - 6371.0 / 3959.0).abs() < 1e-9);
}

#[test]
fn test_default_radius_is_ten_miles() {
    assert!((DEFAULT_SEARCH_RADIUS_KM - 16.0934).abs() < 1e-9);
    assert!((km_to_meters(DEFAULT_SEARCH_RADIUS_KM) - 16_093.4).abs() < 1e-6);
}

#[test]
fn test_text_match_is_case_insensitive_substring() {
    let mut event = create_event("1", "Jazz Night");
    event.description = "Live quartet at the Brudenell".to_string();

    assert!(matches_text(&event, ""));
    assert!(matches_text(&event, "JAZZ"));
    assert!(matches_text(&event, "quartet"));
    assert!(!matches_text(&event, "techno"));
}

#[test]
fn test_tag_match_is_exact() {
    let mut event = create_event("1", "Jazz Night");
    event.tags = vec!["music".to_string()];

    let selected: BTreeSet<String> = ["Music".to_string()].into_iter().collect();
    assert!(!matches_tags(&event, &selected));

    let selected: BTreeSet<String> = ["music".to_string(), "art".to_string()].into_iter().collect();
    assert!(matches_tags(&event, &selected));
    assert!(matches_tags(&event, &BTreeSet::new()));
}

#[test]
fn test_date_range_inclusive_and_open_ended() {
    let event = create_event("1", "Jazz Night");

    assert!(matches_date_range(&event, None));
    assert!(matches_date_range(&event, Some(&DateRange::new(Some(day(10)), Some(day(10))))));
    assert!(matches_date_range(&event, Some(&DateRange::new(None, Some(day(10))))));
    assert!(matches_date_range(&event, Some(&DateRange::new(Some(day(1)), None))));
    assert!(!matches_date_range(&event, Some(&DateRange::new(Some(day(11)), None))));
    assert!(!matches_date_range(&event, Some(&DateRange::new(None, Some(day(9))))));
}

#[test]
fn test_distance_match_boundaries() {
    let origin = Coordinate::new(53.8008, -1.5491);
    let mut event = create_event("1", "Jazz Night");

    // No origin: no constraint, even without a position
    assert!(matches_distance(&event, None, 1.0));
    // Origin set but event has no position
    assert!(!matches_distance(&event, Some(&origin), 10_000.0));

    event.position = Some(origin);
    assert!(matches_distance(&event, Some(&origin), 0.0));
}

#[test]
fn test_rank_by_score_puts_unscored_last() {
    let mut a = create_event("a", "A");
    let b = create_event("b", "B");
    let mut c = create_event("c", "C");
    a.score = Some(0.5);
    c.score = Some(0.9);

    let mut events = vec![b, a, c];
    rank_events(&mut events, RankMode::Score, None);

    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_rank_by_distance_without_origin_keeps_order() {
    let mut events = vec![create_event("x", "X"), create_event("y", "Y")];
    rank_events(&mut events, RankMode::Distance, None);
    assert_eq!(events[0].id, "x");
}

#[test]
fn test_dedup_prefers_scored_entry() {
    let plain = create_event("1", "Jazz Night");
    let mut scored = plain.clone();
    scored.score = Some(0.8);

    let result = dedup_prefer_scored(vec![plain, create_event("2", "Food Fair"), scored]);

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].id, "1");
    assert_eq!(result[0].score, Some(0.8));
    assert_eq!(result[1].id, "2");
}

#[test]
fn test_dedup_keeps_first_when_both_scored() {
    let mut first = create_event("1", "First");
    first.score = Some(0.3);
    let mut second = create_event("1", "Second");
    second.score = Some(0.9);

    let result = dedup_prefer_scored(vec![first, second]);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].title, "First");
}

#[test]
fn test_trigram_similarity() {
    let sim = TrigramSimilarity;
    assert_eq!(sim.similarity("Jazz", " jazz "), 1.0);
    assert_eq!(sim.similarity("", "jazz"), 0.0);
    assert!(sim.similarity("football", "footballs") > 0.6);
    assert!(sim.similarity("football", "opera") < 0.1);
}

#[test]
fn test_normalize_tags() {
    let tags = vec![" Music".to_string(), "music".to_string(), "".to_string(), "Food".to_string()];
    assert_eq!(normalize_tags(&tags), vec!["music", "food"]);
}

#[test]
fn test_search_request_to_criteria() {
    let request: SearchEventsRequest = serde_json::from_value(serde_json::json!({
        "latitude": 53.8008,
        "longitude": -1.5491,
        "searchText": "jazz",
        "selectedTags": ["music"],
        "startDate": "2026-06-01",
        "rank": "distance"
    }))
    .unwrap();

    let origin = request.device_origin();
    assert_eq!(origin, Some(Coordinate::new(53.8008, -1.5491)));
    assert_eq!(request.rank, RankMode::Distance);

    let criteria = request.criteria(origin, DEFAULT_SEARCH_RADIUS_KM);
    assert_eq!(criteria.search_text, "jazz");
    assert!(criteria.selected_tags.contains("music"));
    assert_eq!(criteria.date_range, Some(DateRange::new(Some(day(1)), None)));
    assert_eq!(criteria.radius_km, DEFAULT_SEARCH_RADIUS_KM);
}

#[test]
fn test_criteria_wire_format() {
    let criteria: FilterCriteria = serde_json::from_value(serde_json::json!({
        "searchText": "",
        "selectedTags": ["food"],
        "origin": [53.8008, -1.5491],
        "radiusKm": 5.0
    }))
    .unwrap();

    assert_eq!(criteria.origin, Some(Coordinate::new(53.8008, -1.5491)));
    assert_eq!(criteria.radius_km, 5.0);
    assert!(!criteria.is_empty());
}

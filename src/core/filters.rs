use std::collections::BTreeSet;

use crate::models::{Coordinate, DateRange, Event, FilterCriteria};

/// Free-text match against title and description (case-insensitive)
#[inline]
pub fn matches_text(event: &Event, search_text: &str) -> bool {
    if search_text.is_empty() {
        return true;
    }

    let needle = search_text.to_lowercase();
    event.title.to_lowercase().contains(&needle)
        || event.description.to_lowercase().contains(&needle)
}

/// Tag match: any selected tag present on the event
#[inline]
pub fn matches_tags(event: &Event, selected_tags: &BTreeSet<String>) -> bool {
    selected_tags.is_empty() || selected_tags.iter().any(|tag| event.has_tag(tag))
}

/// Inclusive date range match; an absent range matches everything
#[inline]
pub fn matches_date_range(event: &Event, range: Option<&DateRange>) -> bool {
    range.map_or(true, |r| r.contains(event.date))
}

/// Radius match around `origin`
///
/// Without an origin every event passes. With one, an event lacking a
/// position is excluded.
#[inline]
pub fn matches_distance(event: &Event, origin: Option<&Coordinate>, radius_km: f64) -> bool {
    match origin {
        None => true,
        Some(origin) => event
            .distance_km_from(origin)
            .map_or(false, |distance| distance <= radius_km),
    }
}

/// All predicate categories combined (AND across categories)
#[inline]
pub fn matches_criteria(event: &Event, criteria: &FilterCriteria) -> bool {
    matches_text(event, &criteria.search_text)
        && matches_tags(event, &criteria.selected_tags)
        && matches_date_range(event, criteria.date_range.as_ref())
        && matches_distance(event, criteria.origin.as_ref(), criteria.radius_km)
}

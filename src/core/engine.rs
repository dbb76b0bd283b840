use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::core::filters::matches_criteria;
use crate::models::{Coordinate, Event, FilterCriteria, RankMode};

/// Result of a filter pass
#[derive(Debug)]
pub struct FilterOutcome {
    pub events: Vec<Event>,
    pub total_candidates: usize,
}

/// Applies filter criteria to an event collection
///
/// # Pipeline Stages
/// 1. Predicate filtering (text, tags, date range, radius)
/// 2. Optional ranking
///
/// The engine holds no state between calls: the same events and criteria
/// always give the same result.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoFilterEngine;

impl GeoFilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Filter then rank
    ///
    /// # Arguments
    /// * `events` - Candidate events in their original order
    /// * `criteria` - Filter criteria for this pass
    /// * `rank` - Ordering applied to the surviving events
    pub fn filter(&self, events: &[Event], criteria: &FilterCriteria, rank: RankMode) -> FilterOutcome {
        let total_candidates = events.len();
        let mut filtered = filter_events(events, criteria);
        rank_events(&mut filtered, rank, criteria.origin.as_ref());

        tracing::debug!(
            "Filtered {} of {} events (rank: {:?})",
            filtered.len(),
            total_candidates,
            rank
        );

        FilterOutcome {
            events: filtered,
            total_candidates,
        }
    }
}

/// Return the events matching every criteria category, in input order
pub fn filter_events(events: &[Event], criteria: &FilterCriteria) -> Vec<Event> {
    events
        .iter()
        .filter(|event| matches_criteria(event, criteria))
        .cloned()
        .collect()
}

/// Stable in-place ranking
///
/// `Distance` needs an origin; without one the order is left untouched.
/// Events without a position (or without a score, for `Score`) sort after
/// those that have one.
pub fn rank_events(events: &mut [Event], mode: RankMode, origin: Option<&Coordinate>) {
    match mode {
        RankMode::InputOrder => {}
        RankMode::Distance => {
            let Some(origin) = origin else {
                return;
            };
            events.sort_by(|a, b| {
                compare_present(
                    a.distance_km_from(origin),
                    b.distance_km_from(origin),
                    |x, y| x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                )
            });
        }
        RankMode::Score => {
            events.sort_by(|a, b| {
                compare_present(a.score, b.score, |x, y| {
                    y.partial_cmp(&x).unwrap_or(Ordering::Equal)
                })
            });
        }
    }
}

fn compare_present<F>(a: Option<f64>, b: Option<f64>, cmp: F) -> Ordering
where
    F: Fn(f64, f64) -> Ordering,
{
    match (a, b) {
        (Some(x), Some(y)) => cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Deduplicate by event id, preferring the entry that carries a score
///
/// The surviving entry takes the position of the first occurrence of its id.
/// If both or neither entries are scored, the first one is kept.
pub fn dedup_prefer_scored(entries: Vec<Event>) -> Vec<Event> {
    let mut slots: Vec<Event> = Vec::with_capacity(entries.len());
    let mut index_by_id: HashMap<String, usize> = HashMap::with_capacity(entries.len());

    for entry in entries {
        match index_by_id.get(&entry.id) {
            Some(&idx) => {
                if slots[idx].score.is_none() && entry.score.is_some() {
                    slots[idx] = entry;
                }
            }
            None => {
                index_by_id.insert(entry.id.clone(), slots.len());
                slots.push(entry);
            }
        }
    }

    slots
}

/// Merge the local (geo lookup) stream with the suggested (recommended) one
pub fn merge_streams(local: Vec<Event>, suggested: Vec<Event>) -> Vec<Event> {
    let mut combined = local;
    combined.extend(suggested);
    dedup_prefer_scored(combined)
}

/// Sorted unique tags across all events
pub fn collect_tags(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .flat_map(|event| event.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// Core algorithm exports
pub mod debounce;
pub mod distance;
pub mod engine;
pub mod filters;
pub mod recommend;

pub use debounce::Debouncer;
pub use distance::{haversine_distance, haversine_distance_in, DistanceUnit};
pub use engine::{collect_tags, dedup_prefer_scored, filter_events, merge_streams, rank_events, FilterOutcome, GeoFilterEngine};
pub use filters::{matches_criteria, matches_date_range, matches_distance, matches_tags, matches_text};
pub use recommend::{Recommender, TagSimilarity, TrigramSimilarity};

use std::collections::{HashMap, HashSet};

use crate::models::{Event, RecommendParams};

/// Similarity between two tags in [0, 1]
pub trait TagSimilarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Character trigram similarity (Jaccard index over padded trigrams)
///
/// Identical tags after trimming and lower-casing score 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigramSimilarity;

impl TrigramSimilarity {
    fn trigrams(tag: &str) -> HashSet<[char; 3]> {
        let padded: Vec<char> = format!("  {} ", tag).chars().collect();
        padded.windows(3).map(|w| [w[0], w[1], w[2]]).collect()
    }
}

impl TagSimilarity for TrigramSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        let ta = Self::trigrams(&a);
        let tb = Self::trigrams(&b);
        let shared = ta.intersection(&tb).count() as f64;
        let union = ta.union(&tb).count() as f64;

        if union > 0.0 {
            shared / union
        } else {
            0.0
        }
    }
}

/// Tag-based event recommender
///
/// Scoring:
/// - each profile tag takes its best similarity against the event's tags
/// - a best similarity at or above `threshold` counts as a match
/// - the event score is the mean of its matching similarities
pub struct Recommender<S: TagSimilarity = TrigramSimilarity> {
    similarity: S,
    params: RecommendParams,
}

impl Recommender<TrigramSimilarity> {
    pub fn with_defaults() -> Self {
        Self::new(TrigramSimilarity, RecommendParams::default())
    }
}

impl<S: TagSimilarity> Recommender<S> {
    pub fn new(similarity: S, params: RecommendParams) -> Self {
        Self { similarity, params }
    }

    /// Score events against a profile's tags
    ///
    /// # Returns
    /// At most `limit` events with `score` set, highest first
    pub fn recommend(&self, profile_tags: &[String], events: Vec<Event>) -> Vec<Event> {
        if profile_tags.is_empty() {
            tracing::debug!("Profile has no tags, nothing to recommend");
            return Vec::new();
        }

        let event_tags: HashSet<&str> = events
            .iter()
            .flat_map(|event| event.tags.iter().map(String::as_str))
            .collect();
        if event_tags.is_empty() {
            return Vec::new();
        }

        // One similarity per (profile tag, distinct event tag) pair
        let sim_map: HashMap<(&str, &str), f64> = profile_tags
            .iter()
            .flat_map(|p_tag| {
                event_tags.iter().map(move |e_tag| {
                    let sim = self.similarity.similarity(p_tag, e_tag);
                    ((p_tag.as_str(), *e_tag), sim)
                })
            })
            .collect();

        let scores: Vec<Option<f64>> = events
            .iter()
            .map(|event| self.score_event(profile_tags, &event.tags, &sim_map))
            .collect();

        let mut recommended: Vec<Event> = events
            .into_iter()
            .zip(scores)
            .filter_map(|(mut event, score)| {
                event.score = Some(score?);
                Some(event)
            })
            .collect();

        recommended.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommended.truncate(self.params.limit);

        tracing::debug!(
            "Recommended {} events for {} profile tags",
            recommended.len(),
            profile_tags.len()
        );

        recommended
    }

    fn score_event(
        &self,
        profile_tags: &[String],
        tags: &[String],
        sim_map: &HashMap<(&str, &str), f64>,
    ) -> Option<f64> {
        if tags.is_empty() {
            return None;
        }

        let mut total = 0.0;
        let mut matches = 0usize;

        for p_tag in profile_tags {
            let best = tags
                .iter()
                .filter_map(|e_tag| sim_map.get(&(p_tag.as_str(), e_tag.as_str())))
                .fold(0.0_f64, |acc, sim| acc.max(*sim));

            if best >= self.params.threshold {
                total += best;
                matches += 1;
            }
        }

        (matches > 0).then(|| total / matches as f64)
    }
}

impl Default for Recommender<TrigramSimilarity> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

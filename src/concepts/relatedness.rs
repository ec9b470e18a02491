//! Relatedness engine
//!
//! Scores how close two concepts sit within one specific source text, using
//! the minimum token distance between any occurrence of each. This score alone
//! decides edge creation; it is unrelated to the ranking-only
//! [`connection_strength`](crate::concepts::graph::ConceptGraph::connection_strength).

use crate::concepts::text::{find_sequence, tokenize};
use crate::config::RelatednessConfig;

/// Score floor for concepts that co-occur at any distance
pub const MIN_RELATEDNESS: f64 = 0.1;

/// Distance-decay relatedness scorer
#[derive(Debug, Clone, Default)]
pub struct RelatednessEngine {
    config: RelatednessConfig,
}

impl RelatednessEngine {
    pub fn new(config: RelatednessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelatednessConfig {
        &self.config
    }

    /// Relatedness of `concept_a` and `concept_b` within `source_text`
    ///
    /// - 0 if either concept does not occur in the text
    /// - 1.0 when both occur at the same token index
    /// - `max(0.1, exp(-decay * distance))` below `max_distance`
    /// - 0.1 at or beyond `max_distance`
    pub fn relatedness(&self, concept_a: &str, concept_b: &str, source_text: &str) -> f64 {
        let text_tokens = tokenize(source_text);
        self.relatedness_in_tokens(&tokenize(concept_a), &tokenize(concept_b), &text_tokens)
    }

    /// Same as [`relatedness`](Self::relatedness) over pre-tokenized input
    pub fn relatedness_in_tokens(
        &self,
        concept_a: &[String],
        concept_b: &[String],
        text_tokens: &[String],
    ) -> f64 {
        let positions_a = find_sequence(text_tokens, concept_a);
        let positions_b = find_sequence(text_tokens, concept_b);
        match min_distance(&positions_a, &positions_b) {
            Some(distance) => self.score_distance(distance),
            None => 0.0,
        }
    }

    /// Map a token distance to a score
    pub fn score_distance(&self, distance: usize) -> f64 {
        if distance == 0 {
            return 1.0;
        }
        if distance >= self.config.max_distance {
            return MIN_RELATEDNESS;
        }
        let score = (-self.config.decay * distance as f64).exp();
        if score.is_finite() {
            score.clamp(MIN_RELATEDNESS, 1.0)
        } else {
            MIN_RELATEDNESS
        }
    }

    /// Whether a score is high enough to create an edge
    pub fn should_connect(&self, score: f64) -> bool {
        score > self.config.edge_threshold
    }
}

/// Smallest |i - j| over both sorted position lists, or `None` if either is empty
fn min_distance(a: &[usize], b: &[usize]) -> Option<usize> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (mut i, mut j) = (0, 0);
    let mut best = usize::MAX;
    while i < a.len() && j < b.len() {
        best = best.min(a[i].abs_diff(b[j]));
        if a[i] < b[j] {
            i += 1;
        } else {
            j += 1;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "Machine learning uses neural networks for deep learning tasks";

    #[test]
    fn test_absent_concept_scores_zero() {
        let engine = RelatednessEngine::default();
        assert_eq!(engine.relatedness("machine learning", "blockchain", SCENARIO), 0.0);
        assert_eq!(engine.relatedness("", "machine learning", SCENARIO), 0.0);
        assert_eq!(engine.relatedness("machine learning", "neural networks", ""), 0.0);
    }

    #[test]
    fn test_nearby_concepts_connect() {
        let engine = RelatednessEngine::default();
        let score = engine.relatedness("machine learning", "neural networks", SCENARIO);

        // start indices 0 and 3
        assert!((score - (-0.2f64 * 3.0).exp()).abs() < 1e-12);
        assert!(engine.should_connect(score));
    }

    #[test]
    fn test_case_insensitive() {
        let engine = RelatednessEngine::default();
        let lower = engine.relatedness("machine learning", "deep learning", SCENARIO);
        let upper = engine.relatedness("Machine Learning", "Deep Learning", SCENARIO);
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_same_position_scores_one() {
        let engine = RelatednessEngine::default();
        assert_eq!(engine.relatedness("deep learning", "deep", SCENARIO), 1.0);
    }

    #[test]
    fn test_distance_floor() {
        let engine = RelatednessEngine::default();
        assert_eq!(engine.score_distance(20), MIN_RELATEDNESS);
        assert_eq!(engine.score_distance(500), MIN_RELATEDNESS);
        // exp(-0.2 * 19) ~ 0.022, floored
        assert_eq!(engine.score_distance(19), MIN_RELATEDNESS);
        assert!(!engine.should_connect(MIN_RELATEDNESS));

        let text = format!("alpha {} omega", "filler ".repeat(30));
        let score = engine.relatedness("alpha", "omega", &text);
        assert_eq!(score, MIN_RELATEDNESS);
    }

    #[test]
    fn test_minimum_over_all_occurrences() {
        let engine = RelatednessEngine::default();
        let text = format!("alpha {} beta gamma alpha", "filler ".repeat(30));
        // closest pair: beta at 31, alpha at 33
        let score = engine.relatedness("alpha", "beta", &text);
        assert!((score - (-0.4f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_strict() {
        let engine = RelatednessEngine::new(RelatednessConfig {
            edge_threshold: 0.5,
            ..RelatednessConfig::default()
        });
        assert!(!engine.should_connect(0.5));
        assert!(engine.should_connect(0.51));
    }

    #[test]
    fn test_min_distance() {
        assert_eq!(min_distance(&[0, 10], &[4, 7]), Some(3));
        assert_eq!(min_distance(&[5], &[5]), Some(0));
        assert_eq!(min_distance(&[], &[1]), None);
    }
}

//! Cognitive state classification
//!
//! Scores each candidate state as a weighted sum of threshold predicates over
//! a [`FeatureVector`] and picks the best one. The thresholds and weights are
//! simple heuristics chosen by hand; they are not fitted to data and are not
//! a validated psychometric model.

use chrono::{DateTime, Utc};
use log::debug;

use crate::behavior::types::{CognitiveState, CognitiveStateKind, FeatureVector};
use crate::config::ClassifierConfig;

/// Typing faster than this (keypresses/min) counts as sustained typing
const FOCUSED_TYPING_SPEED: f64 = 40.0;
/// Inter-keystroke stddev (ms) below which cadence counts as steady
const STEADY_RHYTHM_MS: f64 = 100.0;
/// Focus stability at or above which attention counts as stable
const STABLE_FOCUS: f64 = 0.9;

/// Scroll pattern below which a non-trivial scroll counts as smooth reading
const SMOOTH_SCROLL_PATTERN: f64 = 0.005;
/// Pointer speed (px/ms) below which movement counts as calm
const CALM_POINTER_VELOCITY: f64 = 0.5;
/// Typing slower than this (keypresses/min) counts as light typing
const LIGHT_TYPING_SPEED: f64 = 20.0;
/// Focus stability at or above which a reader counts as settled
const SETTLED_FOCUS: f64 = 0.8;

/// More blur events than this counts as frequent task switching
const DISTRACTED_TASK_SWITCHES: u32 = 5;
/// Focus stability below which attention counts as unstable
const UNSTABLE_FOCUS: f64 = 0.8;
/// Scroll pattern above which scrolling counts as erratic
const ERRATIC_SCROLL_PATTERN: f64 = 0.01;
/// Pointer speed (px/ms) above which movement counts as rapid
const RAPID_POINTER_VELOCITY: f64 = 3.0;

/// Inter-keystroke stddev (ms) above which cadence counts as irregular
const IRREGULAR_RHYTHM_MS: f64 = 300.0;
/// Pointer speed (px/ms) below which movement counts as sluggish
const SLUGGISH_POINTER_VELOCITY: f64 = 0.05;

/// Normalization ceilings for the metric-consistency term
const CONSISTENCY_TYPING_SPEED: f64 = 100.0;
const CONSISTENCY_POINTER_VELOCITY: f64 = 2.0;
const CONSISTENCY_SCROLL_PATTERN: f64 = 0.1;

const SCORE_EPSILON: f64 = 1e-9;

/// Ties are broken in this order
const PRIORITY: [CognitiveStateKind; 4] = [
    CognitiveStateKind::Focused,
    CognitiveStateKind::Receptive,
    CognitiveStateKind::Distracted,
    CognitiveStateKind::Fatigued,
];

/// Score and fired indicators for one candidate state
#[derive(Debug, Clone, PartialEq)]
pub struct StateScore {
    pub state: CognitiveStateKind,
    pub score: f64,
    pub indicators: Vec<String>,
}

impl StateScore {
    fn new(state: CognitiveStateKind) -> Self {
        Self {
            state,
            score: 0.0,
            indicators: Vec::new(),
        }
    }

    fn add(&mut self, fired: bool, weight: f64, indicator: &str) {
        if fired {
            self.score += weight;
            self.indicators.push(indicator.to_string());
        }
    }
}

/// Heuristic state classifier
#[derive(Debug, Clone, Default)]
pub struct StateClassifier {
    config: ClassifierConfig,
}

impl StateClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a feature vector into a cognitive state stamped with `timestamp`
    pub fn classify(&self, features: &FeatureVector, timestamp: DateTime<Utc>) -> CognitiveState {
        let scores = self.score_states(features);
        let confidence = self.confidence(features);

        // Later candidates must beat the best by more than rounding noise,
        // so ties keep the higher priority state
        let mut winner: Option<&StateScore> = None;
        for candidate in &scores {
            if candidate.score <= 0.0 {
                continue;
            }
            match winner {
                Some(best) if candidate.score <= best.score + SCORE_EPSILON => {}
                _ => winner = Some(candidate),
            }
        }

        let state = match winner {
            Some(best) => CognitiveState {
                state: best.state,
                confidence,
                indicators: best.indicators.clone(),
                timestamp,
            },
            None => CognitiveState {
                state: CognitiveStateKind::Neutral,
                confidence: confidence.min(self.config.neutral_confidence),
                indicators: Vec::new(),
                timestamp,
            },
        };

        debug!(
            "classified {} (confidence {:.2}) from {} interactions",
            state.state, state.confidence, features.interaction_count
        );
        state
    }

    /// Independent scores for every candidate state, in tie-break priority order
    pub fn score_states(&self, features: &FeatureVector) -> Vec<StateScore> {
        PRIORITY
            .iter()
            .map(|&state| match state {
                CognitiveStateKind::Focused => score_focused(features),
                CognitiveStateKind::Receptive => score_receptive(features),
                CognitiveStateKind::Distracted => score_distracted(features),
                _ => score_fatigued(features),
            })
            .collect()
    }

    /// Compute confidence
    ///
    /// Formula: `0.6 * data_adequacy + 0.4 * metric_consistency`
    /// where `data_adequacy = min(interactions / adequate_interactions, 1)` and
    /// `metric_consistency = max(0, 1 - sqrt(variance(normalized features)))`.
    pub fn confidence(&self, features: &FeatureVector) -> f64 {
        let adequate = self.config.adequate_interactions.max(1) as f64;
        let data_adequacy = (features.interaction_count as f64 / adequate).min(1.0);

        let normalized = [
            (features.typing_speed / CONSISTENCY_TYPING_SPEED).min(1.0),
            (features.pointer_velocity / CONSISTENCY_POINTER_VELOCITY).min(1.0),
            (features.scroll_pattern / CONSISTENCY_SCROLL_PATTERN).min(1.0),
            features.focus_stability,
        ];
        let metric_consistency = (1.0 - variance(&normalized).sqrt()).max(0.0);

        let confidence = 0.6 * data_adequacy + 0.4 * metric_consistency;
        if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn score_focused(f: &FeatureVector) -> StateScore {
    let active = f.interaction_count > 0;
    let mut score = StateScore::new(CognitiveStateKind::Focused);
    score.add(f.typing_speed > FOCUSED_TYPING_SPEED, 0.3, "sustained_typing");
    score.add(
        f.keypress_count >= 3 && f.typing_rhythm < STEADY_RHYTHM_MS,
        0.2,
        "steady_typing_rhythm",
    );
    score.add(active && f.focus_stability >= STABLE_FOCUS, 0.3, "stable_focus");
    score.add(active && f.task_switching == 0, 0.2, "no_task_switching");
    score
}

fn score_receptive(f: &FeatureVector) -> StateScore {
    let active = f.interaction_count > 0;
    let mut score = StateScore::new(CognitiveStateKind::Receptive);
    score.add(
        f.scroll_distance > 0.0 && f.scroll_pattern < SMOOTH_SCROLL_PATTERN,
        0.35,
        "smooth_scrolling",
    );
    score.add(
        f.pointer_velocity > 0.0 && f.pointer_velocity < CALM_POINTER_VELOCITY,
        0.25,
        "calm_pointer",
    );
    score.add(active && f.typing_speed < LIGHT_TYPING_SPEED, 0.2, "light_typing");
    score.add(active && f.focus_stability >= SETTLED_FOCUS, 0.2, "settled_attention");
    score
}

fn score_distracted(f: &FeatureVector) -> StateScore {
    let active = f.interaction_count > 0;
    let mut score = StateScore::new(CognitiveStateKind::Distracted);
    score.add(
        f.task_switching > DISTRACTED_TASK_SWITCHES,
        0.5,
        "frequent_task_switching",
    );
    score.add(active && f.focus_stability < UNSTABLE_FOCUS, 0.2, "unstable_focus");
    score.add(f.scroll_pattern > ERRATIC_SCROLL_PATTERN, 0.2, "erratic_scrolling");
    score.add(f.pointer_velocity > RAPID_POINTER_VELOCITY, 0.1, "rapid_pointer");
    score
}

fn score_fatigued(f: &FeatureVector) -> StateScore {
    let mut score = StateScore::new(CognitiveStateKind::Fatigued);
    score.add(f.typing_rhythm > IRREGULAR_RHYTHM_MS, 0.4, "irregular_typing_rhythm");
    score.add(
        f.typing_speed > 0.0 && f.typing_speed < LIGHT_TYPING_SPEED,
        0.3,
        "slow_typing",
    );
    score.add(
        f.pointer_velocity > 0.0 && f.pointer_velocity < SLUGGISH_POINTER_VELOCITY,
        0.3,
        "sluggish_pointer",
    );
    score
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::features::compute_features;
    use crate::behavior::types::InteractionEvent;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_zero_interactions_is_neutral() {
        let classifier = StateClassifier::default();
        let features = compute_features(&[], 30_000);
        let state = classifier.classify(&features, t0());

        assert_eq!(state.state, CognitiveStateKind::Neutral);
        assert!(state.confidence <= 0.3);
        assert!(state.confidence >= 0.0);
        assert!(state.indicators.is_empty());

        // Deterministic
        assert_eq!(state, classifier.classify(&features, t0()));
    }

    #[test]
    fn test_steady_typing_is_focused() {
        let events: Vec<_> = (0..60)
            .map(|i| InteractionEvent::keypress(at(i * 200)))
            .collect();
        let features = compute_features(&events, 12_000);
        let state = StateClassifier::default().classify(&features, at(12_000));

        assert_eq!(state.state, CognitiveStateKind::Focused);
        assert!(state.confidence > 0.7);
        assert!(state.indicators.contains(&"sustained_typing".to_string()));
        assert!(state.indicators.contains(&"steady_typing_rhythm".to_string()));
    }

    #[test]
    fn test_frequent_blurs_are_distracted() {
        let mut events: Vec<_> = (0..8)
            .map(|i| InteractionEvent::blur(at(i * 3500)))
            .collect();
        events.push(InteractionEvent::keypress(at(1_000)));
        events.push(InteractionEvent::keypress(at(11_000)));
        let features = compute_features(&events, 30_000);
        let state = StateClassifier::default().classify(&features, at(30_000));

        assert_eq!(state.state, CognitiveStateKind::Distracted);
        assert!(state
            .indicators
            .contains(&"frequent_task_switching".to_string()));
    }

    #[test]
    fn test_smooth_reading_is_receptive() {
        let mut events: Vec<_> = (0..10)
            .map(|i| InteractionEvent::scroll(at(i * 2000), 120.0))
            .collect();
        events.push(InteractionEvent::pointer(at(500), 100.0, 100.0));
        events.push(InteractionEvent::pointer(at(1500), 200.0, 100.0));
        let features = compute_features(&events, 30_000);
        let state = StateClassifier::default().classify(&features, at(30_000));

        // focused: stable_focus + no_task_switching = 0.5
        // receptive: smooth + calm + light + settled = 1.0
        assert_eq!(state.state, CognitiveStateKind::Receptive);
        assert!(state.indicators.contains(&"smooth_scrolling".to_string()));
    }

    #[test]
    fn test_irregular_slow_typing_is_fatigued() {
        let features = FeatureVector {
            typing_speed: 12.0,
            typing_rhythm: 450.0,
            pointer_velocity: 0.02,
            focus_stability: 0.5,
            interaction_count: 20,
            keypress_count: 6,
            ..FeatureVector::default()
        };
        let state = StateClassifier::default().classify(&features, t0());

        // fatigued 1.0 beats receptive (calm + light typing = 0.45) and distracted (0.2)
        assert_eq!(state.state, CognitiveStateKind::Fatigued);
    }

    #[test]
    fn test_tie_prefers_focused() {
        let classifier = StateClassifier::default();
        // focused: sustained_typing (0.3) + no_task_switching (0.2) = 0.5
        // distracted: unstable_focus (0.2) + erratic_scrolling (0.2) + rapid_pointer (0.1) = 0.5
        let features = FeatureVector {
            typing_speed: 50.0,
            typing_rhythm: 0.0,
            pointer_velocity: 4.0,
            scroll_pattern: 0.02,
            focus_stability: 0.7,
            task_switching: 0,
            interaction_count: 10,
            keypress_count: 2,
            scroll_distance: 100.0,
        };
        let scores = classifier.score_states(&features);
        let focused = &scores[0];
        let distracted = &scores[2];
        assert!((focused.score - distracted.score).abs() < 1e-9);

        let state = classifier.classify(&features, t0());
        assert_eq!(state.state, CognitiveStateKind::Focused);
    }

    #[test]
    fn test_confidence_bounds() {
        let classifier = StateClassifier::default();
        let extremes = [
            FeatureVector::default(),
            FeatureVector {
                typing_speed: 1e12,
                pointer_velocity: 1e9,
                scroll_pattern: 50.0,
                focus_stability: 0.0,
                interaction_count: u32::MAX,
                ..FeatureVector::default()
            },
            FeatureVector {
                focus_stability: 1.0,
                interaction_count: 25,
                ..FeatureVector::default()
            },
        ];
        for features in &extremes {
            let confidence = classifier.confidence(features);
            assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn test_confidence_formula() {
        let classifier = StateClassifier::default();
        let features = FeatureVector {
            typing_speed: 100.0,
            focus_stability: 1.0,
            interaction_count: 25,
            ..FeatureVector::default()
        };
        // adequacy 0.5, normalized [1, 0, 0, 1] -> stddev 0.5 -> consistency 0.5
        let expected = 0.6 * 0.5 + 0.4 * 0.5;
        assert!((classifier.confidence(&features) - expected).abs() < 1e-9);
    }
}

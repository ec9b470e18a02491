//! Cognitive assessment scoring
//!
//! Maps raw response times and accuracy from short "cognitive game" sessions
//! to 0-100 subscales. The cut-offs below are literal, hand-picked constants
//! kept for compatibility with existing score histories. They are unvalidated
//! heuristics, not a normed psychometric instrument.

use serde::{Deserialize, Serialize};

/// Reaction time game: median RT at or below this scores 100
const REACTION_FAST_MS: f64 = 200.0;
/// Reaction time game: median RT at or above this scores 0
const REACTION_SLOW_MS: f64 = 800.0;

/// Working memory game: span at or below this scores 0
const MEMORY_MIN_SPAN: f64 = 2.0;
/// Working memory game: span at or above this scores 100
const MEMORY_MAX_SPAN: f64 = 9.0;
const MEMORY_FAST_MS: f64 = 500.0;
const MEMORY_SLOW_MS: f64 = 3000.0;

/// Attention game RT bounds
const ATTENTION_FAST_MS: f64 = 300.0;
const ATTENTION_SLOW_MS: f64 = 1200.0;

/// Processing speed game: correct items per minute bounds
const PROCESSING_MIN_RATE: f64 = 10.0;
const PROCESSING_MAX_RATE: f64 = 60.0;

/// Supported assessment games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    ReactionTime,
    WorkingMemory,
    Attention,
    ProcessingSpeed,
}

/// Raw responses from one assessment run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentResponse {
    /// Per-trial response times in milliseconds
    #[serde(default)]
    pub response_times_ms: Vec<f64>,
    /// Number of correct trials
    pub correct: u32,
    /// Number of trials attempted
    pub total: u32,
    /// Longest sequence recalled (working memory only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<u32>,
}

/// Subscale scores, each within [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub kind: AssessmentKind,
    pub speed: f64,
    pub accuracy: f64,
    /// Response-time consistency (100 = identical response times)
    pub consistency: f64,
    pub overall: f64,
}

/// Score one assessment run
pub fn score_assessment(kind: AssessmentKind, response: &AssessmentResponse) -> AssessmentScore {
    let times: Vec<f64> = response
        .response_times_ms
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .collect();
    let accuracy = accuracy_score(response.correct, response.total);
    let consistency = consistency_score(&times);

    let (speed, overall) = match kind {
        AssessmentKind::ReactionTime => {
            let speed = linear_score(median(&times), REACTION_FAST_MS, REACTION_SLOW_MS);
            (speed, 0.7 * speed + 0.3 * accuracy)
        }
        AssessmentKind::WorkingMemory => {
            let speed = linear_score(mean(&times), MEMORY_FAST_MS, MEMORY_SLOW_MS);
            let span = response.span.unwrap_or(0) as f64;
            let span_score =
                ((span - MEMORY_MIN_SPAN) / (MEMORY_MAX_SPAN - MEMORY_MIN_SPAN) * 100.0)
                    .clamp(0.0, 100.0);
            (speed, 0.6 * span_score + 0.3 * accuracy + 0.1 * speed)
        }
        AssessmentKind::Attention => {
            let speed = linear_score(mean(&times), ATTENTION_FAST_MS, ATTENTION_SLOW_MS);
            (speed, 0.3 * speed + 0.5 * accuracy + 0.2 * consistency)
        }
        AssessmentKind::ProcessingSpeed => {
            let total_minutes = times.iter().sum::<f64>() / 60_000.0;
            let rate = if total_minutes > 0.0 {
                response.correct as f64 / total_minutes
            } else {
                0.0
            };
            let speed = ((rate - PROCESSING_MIN_RATE)
                / (PROCESSING_MAX_RATE - PROCESSING_MIN_RATE)
                * 100.0)
                .clamp(0.0, 100.0);
            (speed, 0.8 * speed + 0.2 * accuracy)
        }
    };

    AssessmentScore {
        kind,
        speed,
        accuracy,
        consistency,
        overall: overall.clamp(0.0, 100.0),
    }
}

fn accuracy_score(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (correct.min(total) as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// 100 at or below `fast_ms`, 0 at or above `slow_ms`, linear in between.
/// No responses at all scores 0.
fn linear_score(value_ms: Option<f64>, fast_ms: f64, slow_ms: f64) -> f64 {
    match value_ms {
        Some(v) => ((slow_ms - v) / (slow_ms - fast_ms) * 100.0).clamp(0.0, 100.0),
        None => 0.0,
    }
}

/// 100 × (1 − coefficient of variation), clamped
fn consistency_score(times: &[f64]) -> f64 {
    let Some(mean) = mean(times) else {
        return 0.0;
    };
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / times.len() as f64;
    ((1.0 - variance.sqrt() / mean) * 100.0).clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

//! Behavioral feature derivation
//!
//! Turns one window of interaction events into a [`FeatureVector`]. Every
//! function here is pure and guards its denominators, so degenerate input
//! (empty windows, single samples, duplicate timestamps) yields 0 rather than
//! NaN or infinity.

use crate::behavior::types::{FeatureVector, InteractionEvent, InteractionEventType};

/// Feature extractor for interaction windows
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Compute the feature vector for `events` observed over a `window_ms` span.
    ///
    /// `window_ms` is the span used for focus stability; when it is zero the
    /// span of the events themselves is used instead.
    pub fn compute(events: &[InteractionEvent], window_ms: u64) -> FeatureVector {
        let keypress_times = timestamps_of(events, InteractionEventType::Keypress);
        let blur_count = count_of(events, InteractionEventType::Blur);
        let (scroll_pattern, scroll_distance) = compute_scroll_pattern(events);

        let window_sec = if window_ms > 0 {
            window_ms as f64 / 1000.0
        } else {
            event_span_ms(events) / 1000.0
        };

        FeatureVector {
            typing_speed: compute_typing_speed(&keypress_times),
            typing_rhythm: compute_typing_rhythm(&keypress_times),
            pointer_velocity: compute_pointer_velocity(events),
            scroll_pattern,
            focus_stability: compute_focus_stability(blur_count, window_sec),
            task_switching: blur_count,
            interaction_count: u32::try_from(events.len()).unwrap_or(u32::MAX),
            keypress_count: u32::try_from(keypress_times.len()).unwrap_or(u32::MAX),
            scroll_distance,
        }
    }
}

/// Free-function form of [`FeatureExtractor::compute`]
pub fn compute_features(events: &[InteractionEvent], window_ms: u64) -> FeatureVector {
    FeatureExtractor::compute(events, window_ms)
}

/// Sorted millisecond timestamps of one event type
fn timestamps_of(events: &[InteractionEvent], kind: InteractionEventType) -> Vec<i64> {
    let mut times: Vec<i64> = events
        .iter()
        .filter(|e| e.event_type == kind)
        .map(|e| e.timestamp.timestamp_millis())
        .collect();
    times.sort_unstable();
    times
}

fn count_of(events: &[InteractionEvent], kind: InteractionEventType) -> u32 {
    let count = events.iter().filter(|e| e.event_type == kind).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn event_span_ms(events: &[InteractionEvent]) -> f64 {
    let min = events.iter().map(|e| e.timestamp).min();
    let max = events.iter().map(|e| e.timestamp).max();
    match (min, max) {
        (Some(min), Some(max)) => (max - min).num_milliseconds().max(0) as f64,
        _ => 0.0,
    }
}

/// Compute typing speed
///
/// Formula: `keypresses / elapsed_ms * 60000`
/// Zero below two keypresses or when all keypresses share a timestamp.
fn compute_typing_speed(keypress_times: &[i64]) -> f64 {
    if keypress_times.len() < 2 {
        return 0.0;
    }
    let elapsed_ms = (keypress_times[keypress_times.len() - 1] - keypress_times[0]) as f64;
    if elapsed_ms <= 0.0 {
        return 0.0;
    }
    keypress_times.len() as f64 / elapsed_ms * 60_000.0
}

/// Compute typing rhythm as the population standard deviation of
/// inter-keystroke intervals (ms). Zero below three keypresses.
fn compute_typing_rhythm(keypress_times: &[i64]) -> f64 {
    if keypress_times.len() < 3 {
        return 0.0;
    }
    let deltas: Vec<f64> = keypress_times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64)
        .collect();
    std_dev(&deltas)
}

/// Compute mean pointer velocity in pixels per millisecond
///
/// Each consecutive pair of pointermove samples contributes
/// `distance / dt`. Pairs with missing coordinates or non-positive `dt`
/// contribute 0 rather than being rejected.
fn compute_pointer_velocity(events: &[InteractionEvent]) -> f64 {
    let samples: Vec<&InteractionEvent> = events
        .iter()
        .filter(|e| e.event_type == InteractionEventType::Pointermove)
        .collect();
    if samples.len() < 2 {
        return 0.0;
    }

    let velocities: Vec<f64> = samples
        .windows(2)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let dt = (b.timestamp - a.timestamp).num_milliseconds() as f64;
            match (a.payload.x, a.payload.y, b.payload.x, b.payload.y) {
                (Some(x1), Some(y1), Some(x2), Some(y2)) if dt > 0.0 => {
                    let distance = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
                    finite_or_zero(distance / dt)
                }
                _ => 0.0,
            }
        })
        .collect();

    finite_or_zero(velocities.iter().sum::<f64>() / velocities.len() as f64)
}

/// Compute scroll pattern and total scrolled distance
///
/// Formula: `direction_reversals / max(total_distance, 1)`
/// The distance saturates at `f64::MAX`.
/// Direction comes from `delta_y`, falling back to `delta_x`; scrolls without
/// a delta are counted as zero distance and do not affect direction.
fn compute_scroll_pattern(events: &[InteractionEvent]) -> (f64, f64) {
    let mut reversals = 0u32;
    let mut total_distance = 0.0;
    let mut last_direction: Option<bool> = None;

    for event in events
        .iter()
        .filter(|e| e.event_type == InteractionEventType::Scroll)
    {
        let delta = event
            .payload
            .delta_y
            .filter(|d| *d != 0.0)
            .or(event.payload.delta_x)
            .map(finite_or_zero)
            .unwrap_or(0.0);
        if delta == 0.0 {
            continue;
        }

        total_distance = (total_distance + delta.abs()).min(f64::MAX);
        let downward = delta > 0.0;
        if let Some(previous) = last_direction {
            if previous != downward {
                reversals += 1;
            }
        }
        last_direction = Some(downward);
    }

    let pattern = reversals as f64 / total_distance.max(1.0);
    (pattern, total_distance)
}

/// Compute focus stability
///
/// Formula: `clamp(1 - blur_count / window_seconds, 0, 1)`
/// With no measurable window a single blur already means zero stability.
fn compute_focus_stability(blur_count: u32, window_sec: f64) -> f64 {
    if window_sec <= 0.0 {
        return if blur_count == 0 { 1.0 } else { 0.0 };
    }
    (1.0 - blur_count as f64 / window_sec).clamp(0.0, 1.0)
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    finite_or_zero(variance.sqrt())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

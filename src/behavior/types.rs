//! Behavioral data types
//!
//! This module defines the interaction events fed into a detection session and
//! the feature vectors and cognitive states derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interaction event types captured by the host adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEventType {
    Keypress,
    #[serde(alias = "mousemove")]
    Pointermove,
    Scroll,
    Click,
    Focus,
    Blur,
}

impl InteractionEventType {
    /// Every event kind a session subscribes to
    pub const ALL: [InteractionEventType; 6] = [
        InteractionEventType::Keypress,
        InteractionEventType::Pointermove,
        InteractionEventType::Scroll,
        InteractionEventType::Click,
        InteractionEventType::Focus,
        InteractionEventType::Blur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionEventType::Keypress => "keypress",
            InteractionEventType::Pointermove => "pointermove",
            InteractionEventType::Scroll => "scroll",
            InteractionEventType::Click => "click",
            InteractionEventType::Focus => "focus",
            InteractionEventType::Blur => "blur",
        }
    }
}

/// Type-specific event data.
///
/// Every field is optional: the feature extractor defaults missing values
/// instead of rejecting the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    /// Key identifier for keypress events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Pointer x coordinate in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Pointer y coordinate in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Horizontal scroll delta in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    /// Vertical scroll delta in pixels (positive = down)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
    /// Duration of the interaction in milliseconds (key hold, click press)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Opaque identifier of the interaction target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A single interaction event with timestamp and payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: InteractionEventType,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Type-specific data
    #[serde(default)]
    pub payload: EventPayload,
}

impl InteractionEvent {
    /// Event with an empty payload
    pub fn new(event_type: InteractionEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            timestamp,
            payload: EventPayload::default(),
        }
    }

    pub fn keypress(timestamp: DateTime<Utc>) -> Self {
        Self::new(InteractionEventType::Keypress, timestamp)
    }

    pub fn pointer(timestamp: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self {
            event_type: InteractionEventType::Pointermove,
            timestamp,
            payload: EventPayload {
                x: Some(x),
                y: Some(y),
                ..EventPayload::default()
            },
        }
    }

    pub fn scroll(timestamp: DateTime<Utc>, delta_y: f64) -> Self {
        Self {
            event_type: InteractionEventType::Scroll,
            timestamp,
            payload: EventPayload {
                delta_y: Some(delta_y),
                ..EventPayload::default()
            },
        }
    }

    pub fn blur(timestamp: DateTime<Utc>) -> Self {
        Self::new(InteractionEventType::Blur, timestamp)
    }
}

/// Numeric features derived from one window of events. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Keypresses per minute over the typing span (WPM proxy)
    pub typing_speed: f64,
    /// Standard deviation of inter-keystroke intervals in ms (lower = steadier)
    pub typing_rhythm: f64,
    /// Mean pointer speed in pixels per ms
    pub pointer_velocity: f64,
    /// Scroll direction reversals per scrolled pixel (higher = more erratic)
    pub scroll_pattern: f64,
    /// 1 - blurs per window second, clamped to [0, 1]
    pub focus_stability: f64,
    /// Number of blur events in the window
    pub task_switching: u32,
    /// Total events in the window
    pub interaction_count: u32,
    /// Keypress events in the window
    pub keypress_count: u32,
    /// Total absolute scrolled distance in pixels
    pub scroll_distance: f64,
}

/// Discrete attentional state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveStateKind {
    Focused,
    Receptive,
    Distracted,
    Fatigued,
    Neutral,
}

impl CognitiveStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CognitiveStateKind::Focused => "focused",
            CognitiveStateKind::Receptive => "receptive",
            CognitiveStateKind::Distracted => "distracted",
            CognitiveStateKind::Fatigued => "fatigued",
            CognitiveStateKind::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for CognitiveStateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output contract: `{state, confidence, indicators, timestamp}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveState {
    pub state: CognitiveStateKind,
    /// Confidence in the state (0-1)
    pub confidence: f64,
    /// Names of the predicates that fired for the winning state
    pub indicators: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

//! Detection session orchestration
//!
//! A [`DetectionSession`] is the per-user, per-context owner of a recorder, a
//! classifier and a rolling classification log. Sessions share no state, so
//! several can run side by side without synchronization. The session owns no
//! timer: the host calls [`DetectionSession::tick`] on whatever cadence it
//! chooses (typically every 2-5 seconds).

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use crate::behavior::classifier::StateClassifier;
use crate::behavior::features::FeatureExtractor;
use crate::behavior::recorder::InteractionRecorder;
use crate::behavior::types::{CognitiveState, FeatureVector, InteractionEvent, InteractionEventType};
use crate::config::{EngineConfig, RecorderConfig};
use crate::error::CoreError;

/// Classify a JSON array of events observed over `window_ms` (stateless, one-shot).
///
/// The state is stamped with the latest event timestamp, so identical input
/// always produces identical output. An empty array yields the neutral state
/// stamped with the current time.
///
/// # Example
/// ```ignore
/// let state_json = events_to_state(events_json, 30_000)?;
/// ```
pub fn events_to_state(events_json: &str, window_ms: u64) -> Result<String, CoreError> {
    let events: Vec<InteractionEvent> = serde_json::from_str(events_json)
        .map_err(|e| CoreError::ParseError(format!("Failed to parse interaction events: {}", e)))?;

    let timestamp = events
        .iter()
        .map(|e| e.timestamp)
        .max()
        .unwrap_or_else(Utc::now);
    let features = FeatureExtractor::compute(&events, window_ms);
    let state = StateClassifier::default().classify(&features, timestamp);

    Ok(serde_json::to_string(&state)?)
}

/// Stateful detection session with a rolling classification log
pub struct DetectionSession {
    session_id: String,
    recorder: InteractionRecorder,
    classifier: StateClassifier,
    window_ms: u64,
    history: VecDeque<CognitiveState>,
    history_size: usize,
    subscriptions: BTreeSet<InteractionEventType>,
}

impl Default for DetectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionSession {
    /// Create a started session with default settings
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Create a started session from an engine configuration
    pub fn with_config(config: &EngineConfig) -> Self {
        let RecorderConfig {
            capacity,
            window_ms,
            history_size,
        } = config.recorder;

        let mut session = Self {
            session_id: Uuid::new_v4().to_string(),
            recorder: InteractionRecorder::new(capacity),
            classifier: StateClassifier::new(config.classifier.clone()),
            window_ms,
            history: VecDeque::with_capacity(history_size),
            history_size,
            subscriptions: BTreeSet::new(),
        };
        session.start();
        session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to every tracked event kind. Idempotent.
    pub fn start(&mut self) {
        for kind in InteractionEventType::ALL {
            self.subscriptions.insert(kind);
        }
    }

    /// Drop every subscription. Idempotent; buffered events are kept.
    pub fn stop(&mut self) {
        self.subscriptions.clear();
    }

    pub fn is_active(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Event kinds the host adapter should currently forward
    pub fn subscriptions(&self) -> impl Iterator<Item = InteractionEventType> + '_ {
        self.subscriptions.iter().copied()
    }

    /// Record an event. Returns `false` when the session is not subscribed to
    /// the event's kind, in which case the event is dropped.
    pub fn ingest(&mut self, event: InteractionEvent) -> bool {
        if !self.subscriptions.contains(&event.event_type) {
            return false;
        }
        self.recorder.ingest(event);
        true
    }

    /// Run one sense → classify → emit cycle against the wall clock
    pub fn tick(&mut self) -> CognitiveState {
        self.tick_at(Utc::now())
    }

    /// Run one cycle for the window ending at `now`
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> CognitiveState {
        let features = self.features_at(now);
        let state = self.classifier.classify(&features, now);

        self.history.push_back(state.clone());
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }

        debug!(
            "session {}: {} events in window -> {}",
            self.session_id, features.interaction_count, state.state
        );
        state
    }

    /// Feature vector for the window ending at `now`, without classifying
    pub fn features_at(&self, now: DateTime<Utc>) -> FeatureVector {
        let window = self.recorder.query_at(self.window_ms, now);
        FeatureExtractor::compute(&window, self.window_ms)
    }

    /// Classifications so far, oldest first
    pub fn history(&self) -> impl Iterator<Item = &CognitiveState> {
        self.history.iter()
    }

    /// Most recent classification, if any
    pub fn latest(&self) -> Option<&CognitiveState> {
        self.history.back()
    }

    pub fn buffered_events(&self) -> usize {
        self.recorder.len()
    }

    /// Save the classification log to JSON
    pub fn save_history(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.history).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Replace the classification log from JSON, keeping the newest entries
    pub fn load_history(&mut self, json: &str) -> Result<(), CoreError> {
        let mut history: VecDeque<CognitiveState> =
            serde_json::from_str(json).map_err(|e| CoreError::ParseError(e.to_string()))?;
        while history.len() > self.history_size {
            history.pop_front();
        }
        self.history = history;
        Ok(())
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

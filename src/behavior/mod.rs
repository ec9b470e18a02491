//! Behavioral state inference module
//!
//! This module turns raw interaction telemetry (keypresses, pointer movement,
//! scrolling, focus changes) into a discrete cognitive state with a confidence.
//!
//! Pipeline: Events → Recorder → Feature Extractor → State Classifier → CognitiveState

pub mod assessment;
pub mod classifier;
pub mod features;
pub mod recorder;
pub mod session;
pub mod types;

pub use assessment::{score_assessment, AssessmentKind, AssessmentResponse, AssessmentScore};
pub use classifier::{StateClassifier, StateScore};
pub use features::{compute_features, FeatureExtractor};
pub use recorder::InteractionRecorder;
pub use session::{events_to_state, DetectionSession};
pub use types::{
    CognitiveState, CognitiveStateKind, EventPayload, FeatureVector, InteractionEvent,
    InteractionEventType,
};

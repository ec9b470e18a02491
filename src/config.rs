//! Engine configuration
//!
//! Every section has a `Default` matching the documented heuristics, and all
//! fields are `#[serde(default)]` so a partial JSON document only overrides
//! what it names.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default number of interaction events retained by a recorder
pub const DEFAULT_RECORDER_CAPACITY: usize = 1000;

/// Default trailing window for feature computation (30 seconds)
pub const DEFAULT_WINDOW_MS: u64 = 30_000;

/// Default number of classifications kept in a session's rolling log
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Top-level configuration for both pipelines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub recorder: RecorderConfig,
    pub classifier: ClassifierConfig,
    pub extraction: ExtractionConfig,
    pub relatedness: RelatednessConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the pipelines meaningless
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.recorder.capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "recorder.capacity must be at least 1".to_string(),
            ));
        }
        if self.recorder.window_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "recorder.window_ms must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.classifier.neutral_confidence) {
            return Err(CoreError::InvalidConfig(
                "classifier.neutral_confidence must be within [0, 1]".to_string(),
            ));
        }
        if self.classifier.adequate_interactions == 0 {
            return Err(CoreError::InvalidConfig(
                "classifier.adequate_interactions must be at least 1".to_string(),
            ));
        }
        if self.extraction.top_k == 0 {
            return Err(CoreError::InvalidConfig(
                "extraction.top_k must be at least 1".to_string(),
            ));
        }
        if self.relatedness.max_distance == 0 {
            return Err(CoreError::InvalidConfig(
                "relatedness.max_distance must be at least 1".to_string(),
            ));
        }
        if !self.relatedness.decay.is_finite() || self.relatedness.decay < 0.0 {
            return Err(CoreError::InvalidConfig(
                "relatedness.decay must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relatedness.edge_threshold) {
            return Err(CoreError::InvalidConfig(
                "relatedness.edge_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Interaction recorder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Maximum retained events; the oldest is evicted first
    pub capacity: usize,
    /// Trailing window used by each classification cycle
    pub window_ms: u64,
    /// Length of the rolling classification log
    pub history_size: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RECORDER_CAPACITY,
            window_ms: DEFAULT_WINDOW_MS,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// State classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Upper bound on the confidence reported with a `neutral` state
    pub neutral_confidence: f64,
    /// Interaction count at which data adequacy saturates
    pub adequate_interactions: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            neutral_confidence: 0.3,
            adequate_interactions: 50,
        }
    }
}

/// Concept extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of candidates returned, highest weight first
    pub top_k: usize,
    /// Sentences shorter than this (in chars) are discarded
    pub min_sentence_chars: usize,
    /// Longest non-stopword run emitted as one candidate
    pub max_phrase_tokens: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            top_k: 50,
            min_sentence_chars: 10,
            max_phrase_tokens: 3,
        }
    }
}

/// Relatedness scoring and edge-creation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatednessConfig {
    /// Token distance at which the score floors
    pub max_distance: usize,
    /// Exponential decay per token of distance
    pub decay: f64,
    /// Edges are created only for scores strictly above this
    pub edge_threshold: f64,
}

impl Default for RelatednessConfig {
    fn default() -> Self {
        Self {
            max_distance: 20,
            decay: 0.2,
            edge_threshold: 0.3,
        }
    }
}

//! Error types for cognigraph

use thiserror::Error;

/// Errors raised at the parsing, configuration and persistence surfaces.
///
/// The core computations (feature extraction, classification, concept
/// extraction, relatedness) never fail; they degrade to defaults instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid interaction event: {0}")]
    InvalidEvent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown concept: {0}")]
    UnknownConcept(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

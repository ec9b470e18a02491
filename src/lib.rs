//! cognigraph - On-device cognitive state inference and concept graphs
//!
//! cognigraph runs two independent, deterministic pipelines:
//!
//! - **Behavior**: interaction telemetry → windowed features → cognitive state
//!   (focused, receptive, distracted, fatigued or neutral) with a confidence
//! - **Concepts**: viewed text → weighted, domain-tagged concepts →
//!   token-distance relatedness → a user-scoped, symmetric concept graph
//!
//! Storage is an external collaborator reached through [`persistence`].

pub mod behavior;
pub mod concepts;
pub mod config;
pub mod error;
pub mod persistence;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::CoreError;

// Behavioral exports
pub use behavior::{events_to_state, CognitiveState, CognitiveStateKind, DetectionSession};

// Concept exports
pub use concepts::{text_to_concepts_json, ConceptGraph, ConceptProcessor};

/// cognigraph version
pub const COGNIGRAPH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "cognigraph";

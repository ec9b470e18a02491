//! Concept graph module
//!
//! This module turns viewed text into weighted, domain-tagged concepts and
//! grows a user-scoped, symmetric concept graph from them.
//!
//! Pipeline: Text → Concept Extractor → Relatedness Engine → Graph Store

pub mod domain;
pub mod extractor;
pub mod graph;
pub mod pipeline;
pub mod relatedness;
pub mod text;
pub mod types;

pub use domain::classify_domain;
pub use extractor::ConceptExtractor;
pub use graph::{ConceptGraph, MergeOutcome};
pub use pipeline::{text_to_concepts_json, ConceptProcessor, ContentAnalysis};
pub use relatedness::RelatednessEngine;
pub use types::{ConceptCandidate, ConceptEdge, ConceptNode, EdgeType, GraphSnapshot, NodeView};

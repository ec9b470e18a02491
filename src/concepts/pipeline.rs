//! Concept pipeline orchestration
//!
//! Text → Concept Extractor → Relatedness → Graph merge

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::concepts::extractor::ConceptExtractor;
use crate::concepts::graph::ConceptGraph;
use crate::concepts::relatedness::RelatednessEngine;
use crate::concepts::types::{ConceptCandidate, ConceptEdge, GraphSnapshot};
use crate::config::EngineConfig;
use crate::error::CoreError;

/// Extract weighted concepts from text and return them as JSON (stateless, one-shot).
///
/// Empty or whitespace-only text yields `[]`.
///
/// # Example
/// ```ignore
/// let json = text_to_concepts_json("Machine learning uses neural networks")?;
/// ```
pub fn text_to_concepts_json(text: &str) -> Result<String, CoreError> {
    let concepts = ConceptExtractor::default().extract_concepts(text);
    serde_json::to_string(&concepts).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Result of analyzing one piece of viewed content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Extracted concepts, highest weight first
    pub concepts: Vec<ConceptCandidate>,
    /// Edges this content added to the user's graph
    pub new_edges: Vec<ConceptEdge>,
}

/// Stateful processor that grows one user's concept graph.
///
/// Use one processor per user; processors share no state.
pub struct ConceptProcessor {
    extractor: ConceptExtractor,
    graph: ConceptGraph,
}

impl ConceptProcessor {
    /// Create a processor with default settings
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_config(user_id, &EngineConfig::default())
    }

    /// Create a processor with explicit extraction and relatedness settings
    pub fn with_config(user_id: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            extractor: ConceptExtractor::new(config.extraction.clone()),
            graph: ConceptGraph::with_engine(
                user_id,
                RelatednessEngine::new(config.relatedness.clone()),
            ),
        }
    }

    /// Analyze content viewed now
    pub fn analyze(&mut self, text: &str) -> ContentAnalysis {
        self.analyze_at(text, Utc::now())
    }

    /// Analyze content viewed at `now`
    pub fn analyze_at(&mut self, text: &str, now: DateTime<Utc>) -> ContentAnalysis {
        let concepts = self.extractor.extract_concepts(text);
        if concepts.is_empty() {
            debug!("no concepts found for {}", self.graph.user_id());
            return ContentAnalysis::default();
        }
        let outcome = self.graph.merge_batch(&concepts, text, now);
        ContentAnalysis {
            concepts,
            new_edges: outcome.new_edges,
        }
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    /// Mutable access for mastery updates
    pub fn graph_mut(&mut self) -> &mut ConceptGraph {
        &mut self.graph
    }

    /// Graph output contract for the current graph
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Graph output contract as JSON
    pub fn snapshot_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.graph.snapshot())
            .map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Save graph state to JSON for persistence
    pub fn save_graph(&self) -> Result<String, CoreError> {
        self.graph
            .to_json()
            .map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Load graph state from JSON, keeping this processor's relatedness settings
    pub fn load_graph(&mut self, json: &str) -> Result<(), CoreError> {
        let mut graph =
            ConceptGraph::from_json(json).map_err(|e| CoreError::ParseError(e.to_string()))?;
        graph.set_engine(self.graph.engine().clone());
        self.graph = graph;
        Ok(())
    }

    /// Replace the graph wholesale (e.g. after hydrating from a repository)
    pub fn replace_graph(&mut self, graph: ConceptGraph) {
        self.graph = graph;
    }

    /// Clear all nodes and edges
    pub fn clear_graph(&mut self) {
        self.graph.clear();
    }
}

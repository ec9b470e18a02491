//! Concept graph data types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on any concept weight
pub const MAX_CONCEPT_WEIGHT: f64 = 10.0;

/// Default domain when no keyword matches
pub const GENERAL_DOMAIN: &str = "General";

/// A weighted concept found in one piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCandidate {
    /// Normalized id (lowercase, hyphenated)
    pub id: String,
    /// Surface form of the first occurrence
    pub concept: String,
    /// Domain tag
    pub domain: String,
    /// Extraction weight (0-10)
    pub weight: f64,
    /// Occurrences in the full text
    pub frequency: u32,
    /// Whether the concept is in the technical-term dictionary
    pub technical: bool,
    /// Sentences the concept was found in
    pub contexts: Vec<String>,
}

/// A user-scoped concept in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub concept: String,
    pub domain: String,
    /// Importance weight, capped at 10
    pub weight: f64,
    /// Number of content analyses the concept appeared in; never decreases
    pub frequency: u64,
    /// Learner mastery (0-1), supplied by the host
    #[serde(default)]
    pub mastery: f64,
    /// Ids of connected nodes; always mirrored on the other side
    #[serde(default)]
    pub connections: BTreeSet<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl ConceptNode {
    /// New node from a candidate seen at `now`
    pub fn from_candidate(candidate: &ConceptCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: candidate.id.clone(),
            concept: candidate.concept.clone(),
            domain: candidate.domain.clone(),
            weight: candidate.weight.clamp(0.0, MAX_CONCEPT_WEIGHT),
            frequency: 1,
            mastery: 0.0,
            connections: BTreeSet::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Importance on a 0-1 scale
    pub fn importance(&self) -> f64 {
        (self.weight / MAX_CONCEPT_WEIGHT).clamp(0.0, 1.0)
    }
}

/// Kind of relationship an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Domain,
    Mastery,
    Conceptual,
    Semantic,
    Contextual,
    Temporal,
}

/// An undirected edge between two concepts; `source < target` by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEdge {
    pub source: String,
    pub target: String,
    /// Relatedness at creation time (0-1)
    pub strength: f64,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl ConceptEdge {
    /// Build an edge with its endpoints in canonical order
    pub fn new(a: &str, b: &str, strength: f64, edge_type: EdgeType) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source: source.to_string(),
            target: target.to_string(),
            strength: strength.clamp(0.0, 1.0),
            edge_type,
        }
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// Node entry in the graph output contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub concept: String,
    pub domain: String,
    pub weight: f64,
    pub frequency: u64,
    pub connections: Vec<String>,
}

impl From<&ConceptNode> for NodeView {
    fn from(node: &ConceptNode) -> Self {
        Self {
            id: node.id.clone(),
            concept: node.concept.clone(),
            domain: node.domain.clone(),
            weight: node.weight,
            frequency: node.frequency,
            connections: node.connections.iter().cloned().collect(),
        }
    }
}

/// Graph output contract: `{nodes, edges}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<ConceptEdge>,
}

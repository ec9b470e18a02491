//! Concept graph store
//!
//! A user-scoped graph of concept nodes with undirected, symmetric edges.
//! Two separate scores live here:
//!
//! - **relatedness** (token distance in one source text) decides whether an
//!   edge is created during [`ConceptGraph::merge_batch`]
//! - **connection strength** (domain, mastery, importance) is only used to
//!   rank neighbours for display

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::concepts::relatedness::RelatednessEngine;
use crate::concepts::text::tokenize;
use crate::concepts::types::{
    ConceptCandidate, ConceptEdge, ConceptNode, EdgeType, GraphSnapshot, NodeView,
    GENERAL_DOMAIN, MAX_CONCEPT_WEIGHT,
};
use crate::error::CoreError;

/// Weight of domain equality in connection strength
const DOMAIN_WEIGHT: f64 = 0.4;
/// Weight of average mastery in connection strength
const MASTERY_WEIGHT: f64 = 0.3;
/// Weight of average importance in connection strength
const IMPORTANCE_WEIGHT: f64 = 0.3;

/// Result of merging one extraction batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Ids of nodes created by this batch
    pub created: Vec<String>,
    /// Ids of nodes that already existed and were re-encountered
    pub updated: Vec<String>,
    /// Edges created by this batch
    pub new_edges: Vec<ConceptEdge>,
}

/// User-scoped concept graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptGraph {
    user_id: String,
    nodes: BTreeMap<String, ConceptNode>,
    edges: Vec<ConceptEdge>,
    #[serde(skip)]
    engine: RelatednessEngine,
}

impl ConceptGraph {
    /// Create an empty graph for a user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_engine(user_id, RelatednessEngine::default())
    }

    /// Create an empty graph with a specific relatedness engine
    pub fn with_engine(user_id: impl Into<String>, engine: RelatednessEngine) -> Self {
        Self {
            user_id: user_id.into(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            engine,
        }
    }

    /// Rebuild a graph from stored nodes, repairing any one-sided links
    ///
    /// Edges are reconstructed from the connection sets as `conceptual`
    /// edges weighted by connection strength, since the original relatedness
    /// scores are not stored.
    pub fn from_nodes(
        user_id: impl Into<String>,
        nodes: impl IntoIterator<Item = ConceptNode>,
        engine: RelatednessEngine,
    ) -> Self {
        let mut graph = Self::with_engine(user_id, engine);
        for node in nodes {
            graph.nodes.insert(node.id.clone(), node);
        }
        let repaired = graph.repair_symmetry();
        if repaired > 0 {
            warn!(
                "repaired {} inconsistent links while restoring graph for {}",
                repaired, graph.user_id
            );
        }
        graph
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn engine(&self) -> &RelatednessEngine {
        &self.engine
    }

    /// Replace the relatedness engine (not serialized)
    pub fn set_engine(&mut self, engine: RelatednessEngine) {
        self.engine = engine;
    }

    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.get(id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[ConceptEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `a` and `b` are connected
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.nodes
            .get(a)
            .map_or(false, |node| node.connections.contains(b))
    }

    /// Merge one extraction batch drawn from `source_text`
    ///
    /// 1. Upsert every candidate: new nodes start at frequency 1, existing
    ///    nodes get `frequency += 1`, `last_seen = now` and the larger weight.
    /// 2. Score every unordered pair of batch concepts within `source_text`.
    /// 3. Create a symmetric edge for each pair above the edge threshold that
    ///    is not already connected.
    ///
    /// Edges are planned before any connection set is touched, then both
    /// sides of every planned edge are written together.
    pub fn merge_batch(
        &mut self,
        candidates: &[ConceptCandidate],
        source_text: &str,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        // One entry per id; the first occurrence carries the surface form
        let mut batch: Vec<&ConceptCandidate> = Vec::with_capacity(candidates.len());
        let mut seen = BTreeSet::new();
        for candidate in candidates {
            if candidate.id.is_empty() || !seen.insert(candidate.id.as_str()) {
                continue;
            }
            batch.push(candidate);
        }

        for candidate in &batch {
            match self.nodes.get_mut(&candidate.id) {
                Some(node) => {
                    node.frequency = node.frequency.saturating_add(1);
                    node.last_seen = now;
                    node.weight = node.weight.max(candidate.weight).min(MAX_CONCEPT_WEIGHT);
                    outcome.updated.push(candidate.id.clone());
                }
                None => {
                    self.nodes.insert(
                        candidate.id.clone(),
                        ConceptNode::from_candidate(candidate, now),
                    );
                    outcome.created.push(candidate.id.clone());
                }
            }
        }

        let planned = self.plan_edges(&batch, source_text);
        for edge in &planned {
            self.link(edge.clone());
        }
        outcome.new_edges = planned;

        debug!(
            "merged batch for {}: {} created, {} updated, {} new edges",
            self.user_id,
            outcome.created.len(),
            outcome.updated.len(),
            outcome.new_edges.len()
        );
        outcome
    }

    fn plan_edges(&self, batch: &[&ConceptCandidate], source_text: &str) -> Vec<ConceptEdge> {
        let text_tokens = tokenize(source_text);
        let concept_tokens: Vec<Vec<String>> =
            batch.iter().map(|c| tokenize(&c.concept)).collect();

        let mut planned = Vec::new();
        for i in 0..batch.len() {
            for j in (i + 1)..batch.len() {
                let (a, b) = (batch[i], batch[j]);
                if self.has_edge(&a.id, &b.id) {
                    continue;
                }
                let score = self.engine.relatedness_in_tokens(
                    &concept_tokens[i],
                    &concept_tokens[j],
                    &text_tokens,
                );
                if !self.engine.should_connect(score) {
                    continue;
                }
                planned.push(ConceptEdge::new(&a.id, &b.id, score, self.edge_type(&a.id, &b.id)));
            }
        }
        planned
    }

    /// `domain` when both nodes share a specific domain, otherwise `contextual`
    fn edge_type(&self, a: &str, b: &str) -> EdgeType {
        match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(x), Some(y)) if x.domain == y.domain && x.domain != GENERAL_DOMAIN => {
                EdgeType::Domain
            }
            _ => EdgeType::Contextual,
        }
    }

    /// Write both sides of an edge and record it
    fn link(&mut self, edge: ConceptEdge) {
        if let Some(node) = self.nodes.get_mut(&edge.source) {
            node.connections.insert(edge.target.clone());
        }
        if let Some(node) = self.nodes.get_mut(&edge.target) {
            node.connections.insert(edge.source.clone());
        }
        self.edges.push(edge);
    }

    /// Ranking score for two nodes, `None` if either is unknown
    ///
    /// Formula: `0.4 * [same domain] + 0.3 * avg(mastery) + 0.3 * avg(weight / 10)`
    pub fn connection_strength(&self, a: &str, b: &str) -> Option<f64> {
        let (x, y) = (self.nodes.get(a)?, self.nodes.get(b)?);
        Some(connection_strength(x, y))
    }

    /// Set a node's mastery (clamped to 0-1)
    pub fn set_mastery(&mut self, id: &str, mastery: f64) -> Result<(), CoreError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownConcept(id.to_string()))?;
        node.mastery = if mastery.is_finite() {
            mastery.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok(())
    }

    /// Neighbours of `id`, strongest connection first
    pub fn ranked_neighbours(&self, id: &str) -> Result<Vec<(String, f64)>, CoreError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| CoreError::UnknownConcept(id.to_string()))?;

        let mut ranked: Vec<(String, f64)> = node
            .connections
            .iter()
            .filter_map(|other| {
                self.nodes
                    .get(other)
                    .map(|n| (other.clone(), connection_strength(node, n)))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    /// Every `(from, to)` where `from` lists `to` but not the other way round
    pub fn asymmetric_links(&self) -> Vec<(String, String)> {
        let mut links = Vec::new();
        for node in self.nodes.values() {
            for other in &node.connections {
                let mirrored = self
                    .nodes
                    .get(other)
                    .map_or(false, |n| n.connections.contains(&node.id));
                if !mirrored {
                    links.push((node.id.clone(), other.clone()));
                }
            }
        }
        links
    }

    /// True when every connection is mirrored on the other node
    pub fn verify_symmetry(&self) -> bool {
        self.asymmetric_links().is_empty()
    }

    /// Bring connection sets and the edge list back into agreement
    ///
    /// Dangling ids are dropped, one-sided links are mirrored, edges with a
    /// missing endpoint are removed and connected pairs without an edge get a
    /// `conceptual` edge. Returns the number of fixes applied.
    pub fn repair_symmetry(&mut self) -> usize {
        let mut fixes = 0;

        let ids: BTreeSet<String> = self.nodes.keys().cloned().collect();
        for node in self.nodes.values_mut() {
            let before = node.connections.len();
            let own = node.id.clone();
            node.connections.retain(|c| ids.contains(c) && *c != own);
            fixes += before - node.connections.len();
        }

        for (from, to) in self.asymmetric_links() {
            if let Some(node) = self.nodes.get_mut(&to) {
                node.connections.insert(from);
                fixes += 1;
            }
        }

        let before = self.edges.len();
        self.edges
            .retain(|e| ids.contains(&e.source) && ids.contains(&e.target) && e.source != e.target);
        fixes += before - self.edges.len();

        let mut dedup = BTreeSet::new();
        let before = self.edges.len();
        self.edges
            .retain(|e| dedup.insert((e.source.clone(), e.target.clone())));
        fixes += before - self.edges.len();

        for edge in &self.edges {
            if let Some(node) = self.nodes.get_mut(&edge.source) {
                if node.connections.insert(edge.target.clone()) {
                    fixes += 1;
                }
            }
            if let Some(node) = self.nodes.get_mut(&edge.target) {
                if node.connections.insert(edge.source.clone()) {
                    fixes += 1;
                }
            }
        }

        let mut missing = Vec::new();
        for node in self.nodes.values() {
            for other in node.connections.iter().filter(|other| node.id < **other) {
                let forward = (node.id.clone(), other.clone());
                let backward = (other.clone(), node.id.clone());
                if !dedup.contains(&forward) && !dedup.contains(&backward) {
                    let strength = self.connection_strength(&node.id, other).unwrap_or(0.0);
                    missing.push(ConceptEdge::new(
                        &node.id,
                        other,
                        strength,
                        EdgeType::Conceptual,
                    ));
                }
            }
        }
        fixes += missing.len();
        self.edges.extend(missing);

        fixes
    }

    /// Graph output contract: nodes in id order, edges in creation order
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().map(NodeView::from).collect(),
            edges: self.edges.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a saved graph; nodes are re-keyed by their own id and
    /// inconsistent links are repaired on load
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut graph: Self = serde_json::from_str(json)?;
        graph.nodes = std::mem::take(&mut graph.nodes)
            .into_values()
            .map(|node| (node.id.clone(), node))
            .collect();
        let repaired = graph.repair_symmetry();
        if repaired > 0 {
            warn!("repaired {} inconsistent links in saved graph", repaired);
        }
        Ok(graph)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

fn connection_strength(a: &ConceptNode, b: &ConceptNode) -> f64 {
    let same_domain = if a.domain == b.domain { 1.0 } else { 0.0 };
    let mastery = (a.mastery + b.mastery) / 2.0;
    let importance = (a.importance() + b.importance()) / 2.0;
    let strength = DOMAIN_WEIGHT * same_domain + MASTERY_WEIGHT * mastery + IMPORTANCE_WEIGHT * importance;
    if strength.is_finite() {
        strength.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::extractor::ConceptExtractor;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = "Machine learning uses neural networks for deep learning tasks";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn candidate(concept: &str, domain: &str, weight: f64) -> ConceptCandidate {
        ConceptCandidate {
            id: crate::concepts::text::normalize_id(concept),
            concept: concept.to_string(),
            domain: domain.to_string(),
            weight,
            frequency: 1,
            technical: true,
            contexts: vec![SCENARIO.to_string()],
        }
    }

    fn scenario_batch() -> Vec<ConceptCandidate> {
        vec![
            candidate("Machine learning", "Computer Science", 3.2),
            candidate("neural networks", "Computer Science", 2.9),
            candidate("deep learning", "Computer Science", 2.8),
            candidate("tasks", GENERAL_DOMAIN, 0.9),
        ]
    }

    #[test]
    fn test_scenario_edge_created() {
        let mut graph = ConceptGraph::new("user-1");
        let outcome = graph.merge_batch(&scenario_batch(), SCENARIO, t0());

        assert_eq!(outcome.created.len(), 4);
        assert!(graph.has_edge("machine-learning", "neural-networks"));
        assert!(graph.has_edge("neural-networks", "machine-learning"));

        let edge = graph
            .edges()
            .iter()
            .find(|e| e.connects("machine-learning", "neural-networks"))
            .unwrap();
        assert_eq!(edge.edge_type, EdgeType::Domain);
        assert!((edge.strength - (-0.6f64).exp()).abs() < 1e-9);
        assert_eq!(edge.source, "machine-learning");
    }

    #[test]
    fn test_extracted_scenario_connects() {
        let candidates = ConceptExtractor::default().extract_concepts(SCENARIO);
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&candidates, SCENARIO, t0());

        assert!(graph.has_edge("machine-learning", "neural-networks"));
        assert!(graph.verify_symmetry());
    }

    #[test]
    fn test_contextual_edge_across_domains() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());

        // "deep learning" at 6, "tasks" at 8
        let edge = graph
            .edges()
            .iter()
            .find(|e| e.connects("deep-learning", "tasks"))
            .unwrap();
        assert_eq!(edge.edge_type, EdgeType::Contextual);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut graph = ConceptGraph::new("user-1");
        let first = graph.merge_batch(&scenario_batch(), SCENARIO, t0());
        let edges_after_first = graph.edges().to_vec();

        let later = t0() + chrono::Duration::minutes(10);
        let second = graph.merge_batch(&scenario_batch(), SCENARIO, later);

        assert!(!first.new_edges.is_empty());
        assert!(second.new_edges.is_empty());
        assert!(second.created.is_empty());
        assert_eq!(second.updated.len(), 4);
        assert_eq!(graph.edges(), edges_after_first.as_slice());

        let node = graph.node("machine-learning").unwrap();
        assert_eq!(node.frequency, 2);
        assert_eq!(node.first_seen, t0());
        assert_eq!(node.last_seen, later);
    }

    #[test]
    fn test_duplicate_ids_in_batch_count_once() {
        let mut graph = ConceptGraph::new("user-1");
        let batch = vec![
            candidate("Machine learning", "Computer Science", 3.2),
            candidate("machine learning", "Computer Science", 1.0),
        ];
        let outcome = graph.merge_batch(&batch, SCENARIO, t0());

        assert_eq!(outcome.created, vec!["machine-learning".to_string()]);
        assert_eq!(graph.node("machine-learning").unwrap().frequency, 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_weight_keeps_maximum() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&[candidate("neural networks", "Computer Science", 4.0)], SCENARIO, t0());
        graph.merge_batch(&[candidate("neural networks", "Computer Science", 2.0)], SCENARIO, t0());
        assert_eq!(graph.node("neural-networks").unwrap().weight, 4.0);

        graph.merge_batch(&[candidate("neural networks", "Computer Science", 42.0)], SCENARIO, t0());
        assert_eq!(graph.node("neural-networks").unwrap().weight, MAX_CONCEPT_WEIGHT);
    }

    #[test]
    fn test_distant_concepts_stay_unlinked() {
        let text = format!("alpha {} omega", "filler ".repeat(30));
        let batch = vec![
            candidate("alpha", GENERAL_DOMAIN, 1.0),
            candidate("omega", GENERAL_DOMAIN, 1.0),
        ];
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&batch, &text, t0());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node("alpha").unwrap().connections.is_empty());
    }

    #[test]
    fn test_connection_strength() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());
        graph.set_mastery("machine-learning", 0.8).unwrap();
        graph.set_mastery("neural-networks", 0.4).unwrap();

        // 0.4 + 0.3 * 0.6 + 0.3 * ((0.32 + 0.29) / 2)
        let expected = 0.4 + 0.3 * 0.6 + 0.3 * 0.305;
        let strength = graph
            .connection_strength("machine-learning", "neural-networks")
            .unwrap();
        assert!((strength - expected).abs() < 1e-9);

        // different domains lose the domain term
        let cross = graph.connection_strength("deep-learning", "tasks").unwrap();
        assert!(cross < 0.4);
        assert!(graph.connection_strength("machine-learning", "missing").is_none());
    }

    #[test]
    fn test_set_mastery_unknown_concept() {
        let mut graph = ConceptGraph::new("user-1");
        let err = graph.set_mastery("missing", 0.5).unwrap_err();
        assert!(matches!(err, CoreError::UnknownConcept(id) if id == "missing"));
    }

    #[test]
    fn test_set_mastery_clamps() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());
        graph.set_mastery("tasks", 7.0).unwrap();
        assert_eq!(graph.node("tasks").unwrap().mastery, 1.0);
        graph.set_mastery("tasks", f64::NAN).unwrap();
        assert_eq!(graph.node("tasks").unwrap().mastery, 0.0);
    }

    #[test]
    fn test_ranked_neighbours() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());

        let ranked = graph.ranked_neighbours("deep-learning").unwrap();
        assert!(!ranked.is_empty());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        // same-domain neighbours outrank the General one
        assert_eq!(ranked.last().unwrap().0, "tasks");
        assert!(graph.ranked_neighbours("missing").is_err());
    }

    #[test]
    fn test_symmetry_after_many_batches() {
        let texts = [
            "Quantum mechanics describes particle energy levels",
            "Neural networks learn features from data using gradient descent",
            "Gradient descent minimizes the loss of neural networks",
        ];
        let extractor = ConceptExtractor::default();
        let mut graph = ConceptGraph::new("user-1");
        for text in texts {
            graph.merge_batch(&extractor.extract_concepts(text), text, t0());
        }
        assert!(graph.verify_symmetry());
        for edge in graph.edges() {
            assert!(graph.has_edge(&edge.source, &edge.target));
            assert!(graph.has_edge(&edge.target, &edge.source));
        }
    }

    #[test]
    fn test_repair_symmetry() {
        let mut a = ConceptNode::from_candidate(&candidate("alpha", GENERAL_DOMAIN, 1.0), t0());
        let b = ConceptNode::from_candidate(&candidate("beta", GENERAL_DOMAIN, 1.0), t0());
        a.connections.insert("beta".to_string());
        a.connections.insert("ghost".to_string());

        let graph = ConceptGraph::from_nodes("user-1", vec![a, b], RelatednessEngine::default());

        assert!(graph.verify_symmetry());
        assert!(graph.has_edge("beta", "alpha"));
        assert!(!graph.node("alpha").unwrap().connections.contains("ghost"));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].edge_type, EdgeType::Conceptual);
    }

    #[test]
    fn test_json_round_trip() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());
        graph.set_mastery("deep-learning", 0.5).unwrap();

        let json = graph.to_json().unwrap();
        let restored = ConceptGraph::from_json(&json).unwrap();

        assert_eq!(restored.user_id(), "user-1");
        assert_eq!(restored.snapshot(), graph.snapshot());
        assert_eq!(
            restored.nodes().cloned().collect::<Vec<_>>(),
            graph.nodes().cloned().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_snapshot_contract() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());

        let value = serde_json::to_value(graph.snapshot()).unwrap();
        let node = &value["nodes"][0];
        for key in ["id", "concept", "domain", "weight", "frequency", "connections"] {
            assert!(node.get(key).is_some(), "missing node field {key}");
        }
        let edge = &value["edges"][0];
        for key in ["source", "target", "strength", "type"] {
            assert!(edge.get(key).is_some(), "missing edge field {key}");
        }
    }

    #[test]
    fn test_load_rekeys_nodes_by_id() {
        let mut graph = ConceptGraph::new("user-1");
        graph.merge_batch(&scenario_batch(), SCENARIO, t0());

        let mut value = serde_json::to_value(&graph).unwrap();
        let nodes = value["nodes"].as_object_mut().unwrap();
        let moved = nodes.remove("machine-learning").unwrap();
        nodes.insert("stale-key".to_string(), moved);

        let restored = ConceptGraph::from_json(&value.to_string()).unwrap();

        assert_eq!(restored.node_count(), 4);
        assert!(restored.node("stale-key").is_none());
        assert!(restored.node("machine-learning").is_some());
        assert!(restored.has_edge("neural-networks", "machine-learning"));
        assert!(restored.verify_symmetry());
    }
}

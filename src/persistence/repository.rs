//! Repository boundary
//!
//! The storage engine is an external collaborator. This module defines the
//! logical operations the core needs from it, the stored record shapes and an
//! in-memory implementation for tests and embedding hosts.
//!
//! Connection sets travel as JSON strings in [`StoredConceptNode`]; the
//! conversion to and from [`BTreeSet`] happens only here.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::behavior::types::{CognitiveState, CognitiveStateKind};
use crate::concepts::text::normalize_id;
use crate::concepts::types::ConceptNode;
use crate::error::CoreError;

/// Encode a connection set as a JSON array string
pub fn encode_connections(connections: &BTreeSet<String>) -> Result<String, CoreError> {
    serde_json::to_string(connections).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Decode a stored connection string; malformed input yields an empty set
pub fn decode_connections(raw: &str) -> BTreeSet<String> {
    if raw.trim().is_empty() {
        return BTreeSet::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids.into_iter().filter(|id| !id.is_empty()).collect(),
        Err(e) => {
            warn!("discarding malformed connection list {:?}: {}", raw, e);
            BTreeSet::new()
        }
    }
}

/// A concept node as the storage engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConceptNode {
    pub user_id: String,
    pub id: String,
    pub concept: String,
    pub domain: String,
    pub weight: f64,
    pub frequency: u64,
    pub mastery: f64,
    /// JSON array of connected node ids
    pub connections: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl StoredConceptNode {
    pub fn from_node(user_id: &str, node: &ConceptNode) -> Result<Self, CoreError> {
        Ok(Self {
            user_id: user_id.to_string(),
            id: node.id.clone(),
            concept: node.concept.clone(),
            domain: node.domain.clone(),
            weight: node.weight,
            frequency: node.frequency,
            mastery: node.mastery,
            connections: encode_connections(&node.connections)?,
            first_seen: node.first_seen,
            last_seen: node.last_seen,
        })
    }

    pub fn into_node(self) -> ConceptNode {
        let connections = decode_connections(&self.connections);
        ConceptNode {
            id: self.id,
            concept: self.concept,
            domain: self.domain,
            weight: self.weight,
            frequency: self.frequency,
            mastery: self.mastery,
            connections,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        }
    }
}

/// Filter for [`ConceptRepository::list_by_user`]; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub domain: Option<String>,
    pub min_weight: Option<f64>,
    pub seen_since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl NodeFilter {
    pub fn matches(&self, node: &StoredConceptNode) -> bool {
        if let Some(domain) = &self.domain {
            if &node.domain != domain {
                return false;
            }
        }
        if let Some(min_weight) = self.min_weight {
            if node.weight < min_weight {
                return false;
            }
        }
        if let Some(since) = self.seen_since {
            if node.last_seen < since {
                return false;
            }
        }
        true
    }
}

/// One classified state stored for analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub user_id: String,
    pub state: CognitiveStateKind,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn from_state(user_id: &str, state: &CognitiveState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            state: state.state,
            confidence: state.confidence,
            indicators: state.indicators.clone(),
            timestamp: state.timestamp,
        }
    }
}

/// Logical storage operations required by the core
pub trait ConceptRepository {
    /// Insert or replace a node keyed by `(user_id, id)`
    fn upsert(&mut self, node: StoredConceptNode) -> Result<(), CoreError>;

    /// Look up a node by user and concept text or id
    fn find_by_user_and_concept(
        &self,
        user_id: &str,
        concept: &str,
    ) -> Result<Option<StoredConceptNode>, CoreError>;

    /// All of a user's nodes matching `filter`, heaviest first
    fn list_by_user(
        &self,
        user_id: &str,
        filter: &NodeFilter,
    ) -> Result<Vec<StoredConceptNode>, CoreError>;

    fn create_interaction_record(&mut self, record: InteractionRecord) -> Result<(), CoreError>;

    /// A user's interaction records in timestamp order
    fn interaction_records(&self, user_id: &str) -> Result<Vec<InteractionRecord>, CoreError>;
}

/// Repository held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    nodes: BTreeMap<(String, String), StoredConceptNode>,
    records: Vec<InteractionRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl ConceptRepository for InMemoryRepository {
    fn upsert(&mut self, node: StoredConceptNode) -> Result<(), CoreError> {
        if node.id.is_empty() {
            return Err(CoreError::Persistence("concept id is empty".to_string()));
        }
        self.nodes
            .insert((node.user_id.clone(), node.id.clone()), node);
        Ok(())
    }

    fn find_by_user_and_concept(
        &self,
        user_id: &str,
        concept: &str,
    ) -> Result<Option<StoredConceptNode>, CoreError> {
        let key = (user_id.to_string(), normalize_id(concept));
        Ok(self.nodes.get(&key).cloned())
    }

    fn list_by_user(
        &self,
        user_id: &str,
        filter: &NodeFilter,
    ) -> Result<Vec<StoredConceptNode>, CoreError> {
        let mut nodes: Vec<StoredConceptNode> = self
            .nodes
            .values()
            .filter(|n| n.user_id == user_id && filter.matches(n))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            nodes.truncate(limit);
        }
        Ok(nodes)
    }

    fn create_interaction_record(&mut self, record: InteractionRecord) -> Result<(), CoreError> {
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(CoreError::Persistence(format!(
                "duplicate interaction record {}",
                record.id
            )));
        }
        self.records.push(record);
        Ok(())
    }

    fn interaction_records(&self, user_id: &str) -> Result<Vec<InteractionRecord>, CoreError> {
        let mut records: Vec<InteractionRecord> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

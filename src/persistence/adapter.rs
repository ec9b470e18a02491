//! Persistence adapter
//!
//! Pushes in-memory results to a [`ConceptRepository`] after they have been
//! computed. Write failures are logged and reported, never returned as
//! errors, so the caller's result is unaffected by the storage engine.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::behavior::types::CognitiveState;
use crate::concepts::graph::ConceptGraph;
use crate::concepts::relatedness::RelatednessEngine;
use crate::error::CoreError;
use crate::persistence::repository::{
    ConceptRepository, InteractionRecord, NodeFilter, StoredConceptNode,
};
use crate::persistence::rollup::StateRollup;

/// Outcome of one push to the repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub written: usize,
    /// One message per failed write
    pub failures: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.written == self.attempted
    }

    fn record(&mut self, what: &str, result: Result<(), CoreError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                warn!("failed to persist {}: {}", what, e);
                self.failures.push(format!("{}: {}", what, e));
            }
        }
    }
}

/// Bridge between the core and a storage collaborator
pub struct PersistenceAdapter<R: ConceptRepository> {
    repository: R,
}

impl<R: ConceptRepository> PersistenceAdapter<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    pub fn into_inner(self) -> R {
        self.repository
    }

    /// Upsert every node of `graph` under its user
    pub fn sync_graph(&mut self, graph: &ConceptGraph) -> SyncReport {
        let mut report = SyncReport::default();
        for node in graph.nodes() {
            let result = StoredConceptNode::from_node(graph.user_id(), node)
                .and_then(|stored| self.repository.upsert(stored));
            report.record(&format!("concept {}", node.id), result);
        }
        debug!(
            "synced graph for {}: {}/{} nodes written",
            graph.user_id(),
            report.written,
            report.attempted
        );
        report
    }

    /// Store one classified state for analytics
    pub fn record_state(&mut self, user_id: &str, state: &CognitiveState) -> SyncReport {
        let mut report = SyncReport::default();
        let record = InteractionRecord::from_state(user_id, state);
        let what = format!("interaction record {}", record.id);
        report.record(&what, self.repository.create_interaction_record(record));
        report
    }

    /// Rebuild a user's graph from the repository, repairing one-sided links
    pub fn hydrate_graph(
        &self,
        user_id: &str,
        engine: RelatednessEngine,
    ) -> Result<ConceptGraph, CoreError> {
        let stored = self
            .repository
            .list_by_user(user_id, &NodeFilter::default())?;
        debug!("hydrating {} nodes for {}", stored.len(), user_id);
        Ok(ConceptGraph::from_nodes(
            user_id,
            stored.into_iter().map(StoredConceptNode::into_node),
            engine,
        ))
    }

    /// Analytics rollup over a user's stored states
    pub fn rollup(&self, user_id: &str) -> Result<StateRollup, CoreError> {
        let records = self.repository.interaction_records(user_id)?;
        Ok(StateRollup::from_records(&records))
    }
}

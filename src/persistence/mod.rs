//! Persistence boundary
//!
//! The core computes results in memory; this module hands them to an
//! external storage collaborator and restores them on demand.

pub mod adapter;
pub mod repository;
pub mod rollup;

pub use adapter::{PersistenceAdapter, SyncReport};
pub use repository::{
    decode_connections, encode_connections, ConceptRepository, InMemoryRepository,
    InteractionRecord, NodeFilter, StoredConceptNode,
};
pub use rollup::StateRollup;

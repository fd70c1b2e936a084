//! Graph ingestion for ViruskG
//!
//! Writes triples into a graph store with merge-only semantics:
//!
//! ```text
//!   [Triple]  ──►  GraphIngestor  ──►  batches of EdgeUpsert  ──►  GraphStore
//!                  (sanitize,                                      ├─ Neo4jGraph
//!                   per-batch dedup)                               └─ MemoryGraph
//! ```
//!
//! ## Guarantees
//!
//! - **Idempotent**: a node per distinct `name`, one edge per
//!   `(subject, relation, object)`; replaying any triple is a no-op
//! - **Batch-size invariant**: batching bounds transaction size only
//! - **Parameterized**: relation labels reach the store as query parameters,
//!   never as interpolated query text

use thiserror::Error;

pub mod ingest;
pub mod memory;
pub mod neo4j;
pub mod store;

pub use ingest::{GraphIngestor, IngestReport, DEFAULT_BATCH_SIZE};
pub use memory::MemoryGraph;
pub use neo4j::{Neo4jConfig, Neo4jGraph, RelationEncoding};
pub use store::{EdgeUpsert, GraphStore};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid graph configuration: {0}")]
    Config(String),
    #[error("graph store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

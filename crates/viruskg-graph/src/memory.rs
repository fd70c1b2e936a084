//! In-memory graph store for dry runs and tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::store::{EdgeUpsert, GraphStore};
use crate::Result;

/// Nodes keyed by name, edges keyed by `(subject, relation, object)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryGraph {
    nodes: BTreeSet<String>,
    edges: BTreeSet<(String, String, String)>,
    batches: usize,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Batches merged so far (including no-op ones).
    pub fn batches_merged(&self) -> usize {
        self.batches
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn has_edge(&self, subject: &str, relation: &str, object: &str) -> bool {
        self.edges
            .contains(&(subject.to_string(), relation.to_string(), object.to_string()))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.edges
            .iter()
            .map(|(s, r, o)| (s.as_str(), r.as_str(), o.as_str()))
    }
}

impl GraphStore for MemoryGraph {
    fn merge_batch(&mut self, batch: &[EdgeUpsert]) -> Result<()> {
        for edge in batch {
            self.nodes.insert(edge.subject.clone());
            self.nodes.insert(edge.object.clone());
            self.edges.insert((
                edge.subject.clone(),
                edge.relation.clone(),
                edge.object.clone(),
            ));
        }
        self.batches += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

//! The store seam.

use serde::{Deserialize, Serialize};
use viruskg_ingest::{sanitize_identifier, Triple};

use crate::Result;

/// One create-or-merge request: two named nodes and a labelled edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeUpsert {
    pub subject: String,
    /// Sanitized relation label.
    pub relation: String,
    pub object: String,
}

impl EdgeUpsert {
    /// `None` for triples with a blank subject or object.
    pub fn from_triple(triple: &Triple) -> Option<Self> {
        if !triple.is_well_formed() {
            return None;
        }
        Some(Self {
            subject: triple.subject.trim().to_string(),
            relation: sanitize_identifier(triple.relation.trim()),
            object: triple.object.trim().to_string(),
        })
    }
}

/// A graph store with merge semantics.
///
/// `merge_batch` must be idempotent: merging an edge that already exists
/// changes nothing and is not an error. A batch is applied as one unit at
/// the store's discretion; nothing spans batches.
pub trait GraphStore {
    fn merge_batch(&mut self, batch: &[EdgeUpsert]) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

impl<S: GraphStore + ?Sized> GraphStore for Box<S> {
    fn merge_batch(&mut self, batch: &[EdgeUpsert]) -> Result<()> {
        (**self).merge_batch(batch)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

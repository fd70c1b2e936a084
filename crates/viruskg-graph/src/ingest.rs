//! Batched, idempotent triple ingestion.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use viruskg_ingest::Triple;

use crate::store::{EdgeUpsert, GraphStore};
use crate::Result;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What one [`GraphIngestor::ingest`] call sent to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub triples: usize,
    pub edges_sent: usize,
    pub batches: usize,
    /// Repeats of an edge already in the same batch.
    pub duplicates_dropped: usize,
    /// Triples with a blank subject or object.
    pub invalid_skipped: usize,
}

impl IngestReport {
    pub fn absorb(&mut self, other: &IngestReport) {
        self.triples += other.triples;
        self.edges_sent += other.edges_sent;
        self.batches += other.batches;
        self.duplicates_dropped += other.duplicates_dropped;
        self.invalid_skipped += other.invalid_skipped;
    }
}

/// Splits triples into fixed-size batches and merges them into a store.
///
/// A failing batch aborts the call; batches before it have already landed.
/// Re-running is always safe because the store only merges.
pub struct GraphIngestor<S> {
    store: S,
    batch_size: usize,
}

impl<S: GraphStore> GraphIngestor<S> {
    /// `batch_size` of zero is treated as one.
    pub fn new(store: S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_default_batch_size(store: S) -> Self {
        Self::new(store, DEFAULT_BATCH_SIZE)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn ingest(&mut self, triples: &[Triple]) -> Result<IngestReport> {
        let mut report = IngestReport {
            triples: triples.len(),
            ..Default::default()
        };

        for (index, chunk) in triples.chunks(self.batch_size).enumerate() {
            let mut seen = HashSet::with_capacity(chunk.len());
            let mut batch = Vec::with_capacity(chunk.len());
            for triple in chunk {
                let Some(edge) = EdgeUpsert::from_triple(triple) else {
                    report.invalid_skipped += 1;
                    tracing::warn!(subject = %triple.subject, relation = %triple.relation, "skipping triple with blank endpoint");
                    continue;
                };
                if seen.insert(edge.clone()) {
                    batch.push(edge);
                } else {
                    report.duplicates_dropped += 1;
                }
            }
            if batch.is_empty() {
                continue;
            }

            if let Err(e) = self.store.merge_batch(&batch) {
                tracing::error!(
                    store = self.store.name(),
                    batch = index,
                    landed_batches = report.batches,
                    error = %e,
                    "graph batch failed"
                );
                return Err(e);
            }
            report.batches += 1;
            report.edges_sent += batch.len();
            tracing::debug!(store = self.store.name(), batch = index, edges = batch.len(), "merged batch");
        }

        Ok(report)
    }
}

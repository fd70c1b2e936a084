//! The per-record driver.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use viruskg_graph::{GraphIngestor, GraphStore, IngestReport};
use viruskg_ingest::{
    annotate_and_extract, assemble_triples, load_records, mine_characteristics, Annotator,
    IngestError, Record,
};

use crate::sink::TripleSink;
use crate::{PipelineError, Result};

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No usable `virus_name`; nothing was emitted.
    Skipped,
    Processed {
        triples: usize,
        written: usize,
        graph: IngestReport,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Input lines that were not valid records.
    pub malformed_lines: usize,
    pub triples_assembled: usize,
    pub triples_written: usize,
    pub graph: IngestReport,
}

impl RunSummary {
    pub fn triples_sent(&self) -> usize {
        self.graph.edges_sent
    }
}

/// Sequential record driver.
///
/// Owns its annotator and both optional sinks for the whole run. Records are
/// processed one at a time; a failure is logged against the record's name
/// and the next record proceeds.
pub struct Pipeline<A, S, W: Write> {
    annotator: A,
    sink: Option<TripleSink<W>>,
    graph: Option<GraphIngestor<S>>,
}

impl<A, S, W> Pipeline<A, S, W>
where
    A: Annotator,
    S: GraphStore,
    W: Write,
{
    pub fn new(annotator: A, sink: Option<TripleSink<W>>, graph: Option<GraphIngestor<S>>) -> Self {
        Self {
            annotator,
            sink,
            graph,
        }
    }

    pub fn sink(&self) -> Option<&TripleSink<W>> {
        self.sink.as_ref()
    }

    pub fn graph(&self) -> Option<&GraphIngestor<S>> {
        self.graph.as_ref()
    }

    pub fn into_parts(self) -> (A, Option<TripleSink<W>>, Option<GraphIngestor<S>>) {
        (self.annotator, self.sink, self.graph)
    }

    pub fn process_record(&mut self, record: &Record) -> Result<RecordOutcome> {
        let Some(name) = record.identity() else {
            tracing::info!(
                virus_name = record.virus_name.as_deref().unwrap_or(""),
                "skipping record without a virus name"
            );
            return Ok(RecordOutcome::Skipped);
        };

        let text = record.characteristics();
        let mined = mine_characteristics(text);
        let syntactic = annotate_and_extract(&mut self.annotator, text)?;
        let triples = assemble_triples(record, &mined, &syntactic);

        let written = match &mut self.sink {
            Some(sink) => sink.write_triples(&triples)?,
            None => 0,
        };
        let graph = match &mut self.graph {
            Some(ingestor) => ingestor.ingest(&triples)?,
            None => IngestReport::default(),
        };

        tracing::info!(
            record = %name,
            triples = triples.len(),
            entities = syntactic.entities.len(),
            relations = syntactic.relations.len(),
            "processed virus"
        );
        Ok(RecordOutcome::Processed {
            triples: triples.len(),
            written,
            graph,
        })
    }

    pub fn run<I>(&mut self, records: I) -> RunSummary
    where
        I: IntoIterator<Item = Record>,
    {
        let mut summary = RunSummary::default();
        for record in records {
            match self.process_record(&record) {
                Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                Ok(RecordOutcome::Processed {
                    triples,
                    written,
                    graph,
                }) => {
                    summary.processed += 1;
                    summary.triples_assembled += triples;
                    summary.triples_written += written;
                    summary.graph.absorb(&graph);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        record = record.virus_name.as_deref().unwrap_or(""),
                        stage = e.stage(),
                        error = %e,
                        "failed to process record"
                    );
                }
            }
        }
        summary
    }

    /// Stream records from a line-delimited JSON file. Only opening the file
    /// can fail.
    pub fn run_file(&mut self, path: &Path) -> Result<RunSummary> {
        let mut records = load_records(path).map_err(|e| match e {
            IngestError::Io(io) => PipelineError::Io(io),
            other => other.into(),
        })?;
        let mut summary = self.run(records.by_ref());
        summary.malformed_lines = records.malformed_lines();
        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            malformed_lines = summary.malformed_lines,
            triples_written = summary.triples_written,
            triples_sent = summary.triples_sent(),
            "run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viruskg_graph::{EdgeUpsert, GraphError, MemoryGraph};
    use viruskg_ingest::{
        AnnotatedDocument, DisabledAnnotator, EntityMention, Sentence, Token,
    };

    fn record(name: Option<&str>, characteristics: Option<&str>) -> Record {
        Record {
            virus_name: name.map(str::to_string),
            origin: Some("Germany".into()),
            virus_characteristics: characteristics.map(str::to_string),
            ..Default::default()
        }
    }

    fn pipeline<A: Annotator>(annotator: A) -> Pipeline<A, MemoryGraph, Vec<u8>> {
        Pipeline::new(
            annotator,
            Some(TripleSink::new(Vec::new())),
            Some(GraphIngestor::new(MemoryGraph::new(), 100)),
        )
    }

    /// Tags every text with one ORG mention; fails on texts containing "boom".
    struct Scripted;

    impl Annotator for Scripted {
        fn annotate(&mut self, text: &str) -> viruskg_ingest::Result<AnnotatedDocument> {
            if text.contains("boom") {
                return Err(IngestError::Annotation("server returned 500".into()));
            }
            Ok(AnnotatedDocument {
                sentences: vec![Sentence {
                    tokens: vec![Token {
                        id: 1,
                        text: "McAfee".into(),
                        lemma: None,
                        upos: Some("PROPN".into()),
                        xpos: None,
                        deprel: "root".into(),
                        head: 0,
                    }],
                    mentions: vec![EntityMention {
                        text: "McAfee".into(),
                        label: "ORG".into(),
                    }],
                }],
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[test]
    fn unknown_and_missing_names_never_reach_the_sinks() {
        let mut p = pipeline(DisabledAnnotator);
        let summary = p.run(vec![record(None, None), record(Some("Unknown"), Some("text"))]);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.processed, 0);

        let (_, sink, graph) = p.into_parts();
        assert!(sink.unwrap().into_inner().is_empty());
        assert_eq!(graph.unwrap().store().batches_merged(), 0);
    }

    #[test]
    fn processed_record_reaches_both_sinks() {
        let mut p = pipeline(Scripted);
        let outcome = p
            .process_record(&record(Some("Cascade"), Some("Seen by vendors.")))
            .unwrap();
        assert_eq!(
            outcome,
            RecordOutcome::Processed {
                triples: 3,
                written: 3,
                graph: IngestReport {
                    triples: 3,
                    edges_sent: 3,
                    batches: 1,
                    duplicates_dropped: 0,
                    invalid_skipped: 0,
                },
            }
        );
        let store = p.graph().unwrap().store();
        assert!(store.has_edge("Cascade", "is_a", "Virus"));
        assert!(store.has_edge("Cascade", "has_origin", "Germany"));
        assert!(store.has_edge("McAfee", "is_a", "ORG"));
    }

    #[test]
    fn annotation_failure_skips_only_that_record() {
        let mut p = pipeline(Scripted);
        let summary = p.run(vec![
            record(Some("Cascade"), Some("fine")),
            record(Some("Stoned"), Some("boom")),
            record(Some("Melissa"), None),
        ]);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);

        let store = p.graph().unwrap().store();
        assert!(!store.has_node("Stoned"));
        assert!(store.has_node("Melissa"));
    }

    struct Offline;

    impl GraphStore for Offline {
        fn merge_batch(&mut self, _batch: &[EdgeUpsert]) -> viruskg_graph::Result<()> {
            Err(GraphError::Store("connection refused".into()))
        }

        fn name(&self) -> &'static str {
            "offline"
        }
    }

    #[test]
    fn graph_failure_is_per_record_and_file_output_survives() {
        let mut p = Pipeline::new(
            DisabledAnnotator,
            Some(TripleSink::new(Vec::new())),
            Some(GraphIngestor::new(Offline, 100)),
        );
        let summary = p.run(vec![record(Some("Cascade"), None), record(Some("Stoned"), None)]);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.triples_sent(), 0);

        let (_, sink, _) = p.into_parts();
        let out = String::from_utf8(sink.unwrap().into_inner()).unwrap();
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn run_file_counts_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viruses.jsonl");
        std::fs::write(
            &path,
            "{\"virus_name\": \"Cascade\"}\nnot json\n\n{\"virus_name\": \"Unknown\"}\n",
        )
        .unwrap();

        let mut p: Pipeline<_, MemoryGraph, Vec<u8>> = Pipeline::new(
            DisabledAnnotator,
            Some(TripleSink::new(Vec::new())),
            None,
        );
        let summary = p.run_file(&path).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.malformed_lines, 1);
        assert_eq!(summary.triples_written, 1);
        assert_eq!(summary.triples_sent(), 0);
    }

    #[test]
    fn run_file_fails_on_missing_input() {
        let mut p: Pipeline<_, MemoryGraph, Vec<u8>> = Pipeline::new(DisabledAnnotator, None, None);
        let err = p.run_file(Path::new("/nonexistent/viruses.jsonl")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}

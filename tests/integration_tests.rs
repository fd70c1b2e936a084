//! Integration tests for the complete ViruskG pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Record file → Miner + Extractor → Assembler → JSONL sink
//! - Assembler → GraphIngestor → MemoryGraph
//! - Re-running a record file against the same store
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;
use tempfile::tempdir;

use viruskg_graph::{GraphIngestor, MemoryGraph};
use viruskg_ingest::{
    AnnotatedDocument, Annotator, EntityMention, Sentence, Token, Triple,
};
use viruskg_pipeline::{Pipeline, RunSummary, TripleSink};

// ============================================================================
// Fixtures
// ============================================================================

fn tok(id: usize, text: &str, lemma: &str, upos: &str, deprel: &str, head: usize) -> Token {
    Token {
        id,
        text: text.to_string(),
        lemma: Some(lemma.to_string()),
        upos: Some(upos.to_string()),
        xpos: None,
        deprel: deprel.to_string(),
        head,
    }
}

fn mention(text: &str, label: &str) -> EntityMention {
    EntityMention {
        text: text.to_string(),
        label: label.to_string(),
    }
}

/// Returns the same parse for every text, as a pinned annotation server would.
struct FixedParse {
    calls: usize,
}

impl Annotator for FixedParse {
    fn annotate(&mut self, _text: &str) -> viruskg_ingest::Result<AnnotatedDocument> {
        self.calls += 1;
        Ok(AnnotatedDocument {
            sentences: vec![
                // The virus infects files .
                Sentence {
                    tokens: vec![
                        tok(1, "The", "the", "DET", "det", 2),
                        tok(2, "virus", "virus", "NOUN", "nsubj", 3),
                        tok(3, "infects", "infect", "VERB", "root", 0),
                        tok(4, "files", "file", "NOUN", "obj", 3),
                    ],
                    mentions: vec![],
                },
                // It adds 1,701 bytes .
                Sentence {
                    tokens: vec![
                        tok(1, "It", "it", "PRON", "nsubj", 2),
                        tok(2, "adds", "add", "VERB", "root", 0),
                        tok(3, "1,701", "1,701", "NUM", "nummod", 4),
                        tok(4, "bytes", "byte", "NOUN", "obj", 2),
                    ],
                    mentions: vec![mention("1,701", "CARDINAL")],
                },
                // systems of infected users
                Sentence {
                    tokens: vec![
                        tok(1, "systems", "system", "NOUN", "root", 0),
                        tok(2, "of", "of", "ADP", "case", 4),
                        tok(3, "infected", "infected", "ADJ", "amod", 4),
                        tok(4, "users", "user", "NOUN", "nmod", 1),
                    ],
                    mentions: vec![mention("McAfee", "ORGANIZATION")],
                },
            ],
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

const CASCADE_TEXT: &str = "Symptoms: letters fall to the bottom of the screen. \
Infected .EXE files will not run.\n\
Infected .COM files have a file length increase of 1,701 bytes. \
Infected .COM files have a file length increase of 1,704 bytes.";

fn write_records(dir: &Path) -> std::path::PathBuf {
    let records = [
        serde_json::json!({
            "virus_name": "Cascade",
            "aliases": "1701, Falling Letters",
            "origin": "Germany",
            "length": 1701,
            "virus_characteristics": CASCADE_TEXT,
        }),
        serde_json::json!({ "virus_name": "Unknown", "origin": "Mars" }),
        serde_json::json!({ "origin": "no name at all" }),
        serde_json::json!({
            "virus_name": "Stoned",
            "type": "Boot Sector",
            "dat_release_date": "01/01/1990",
        }),
    ];
    let mut text = String::new();
    for record in records {
        text.push_str(&record.to_string());
        text.push('\n');
    }
    text.push_str("{\"virus_name\": \n");
    let path = dir.join("viruses.jsonl");
    fs::write(&path, text).unwrap();
    path
}

fn run_once(
    input: &Path,
    output: &Path,
    store: MemoryGraph,
    batch_size: usize,
) -> (RunSummary, MemoryGraph, usize) {
    let sink = TripleSink::create(output, false).unwrap();
    let mut pipeline = Pipeline::new(
        FixedParse { calls: 0 },
        Some(sink),
        Some(GraphIngestor::new(store, batch_size)),
    );
    let summary = pipeline.run_file(input).unwrap();
    let (annotator, _, graph) = pipeline.into_parts();
    (summary, graph.unwrap().into_store(), annotator.calls)
}

fn read_triples(path: &Path) -> Vec<Triple> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_records_to_file_and_graph() {
    let dir = tempdir().unwrap();
    let input = write_records(dir.path());
    let output = dir.path().join("triples.jsonl");

    let (summary, graph, calls) = run_once(&input, &output, MemoryGraph::new(), 100);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.malformed_lines, 1);
    // Stoned has no characteristics text, so only Cascade is annotated.
    assert_eq!(calls, 1);

    let triples = read_triples(&output);
    assert_eq!(summary.triples_written, triples.len());
    let has = |s: &str, r: &str, o: &str| triples.contains(&Triple::new(s, r, o));

    // structured fields, in declaration order, lenient numbers
    assert_eq!(triples[0], Triple::new("Cascade", "is_a", "Virus"));
    assert_eq!(triples[1], Triple::new("Cascade", "has_aliases", "1701, Falling Letters"));
    assert_eq!(triples[2], Triple::new("Cascade", "has_origin", "Germany"));
    assert_eq!(triples[3], Triple::new("Cascade", "has_length", "1701"));

    // mined: last length increase wins
    assert!(has(
        "Cascade",
        "has_symptoms",
        "letters fall to the bottom of the screen."
    ));
    assert!(has("Cascade", "COM_length_increase", "1,704 bytes."));
    assert!(!has("Cascade", "COM_length_increase", "1,701 bytes."));
    let mined: Vec<_> = triples
        .iter()
        .filter(|t| t.relation.ends_with("_length_increase"))
        .collect();
    assert_eq!(mined.len(), 1, "{mined:?}");

    // syntactic
    assert!(has("1,701", "is_a", "CARDINAL"));
    assert!(has("McAfee", "is_a", "ORG"));
    assert!(has("infected", "has", "status"));
    assert!(has("size", "has", "adds"));
    assert!(has("infects", "infect", "virus"));
    assert!(has("infects", "infect", "files"));
    assert!(has("adds", "add", "bytes"));
    assert!(!triples.iter().any(|t| t.subject == "systems"));

    assert!(has("Stoned", "has_type", "Boot Sector"));
    assert!(has("Stoned", "has_dat_release_date", "01/01/1990"));
    assert!(!triples.iter().any(|t| t.subject == "Unknown" || t.object == "Mars"));

    // every written triple is in the graph
    for t in &triples {
        assert!(graph.has_edge(&t.subject, &t.relation, &t.object), "{t:?}");
    }
}

#[test]
fn test_rerun_against_same_store_is_idempotent() {
    let dir = tempdir().unwrap();
    let input = write_records(dir.path());
    let output = dir.path().join("triples.jsonl");

    let (_, graph, _) = run_once(&input, &output, MemoryGraph::new(), 100);
    let (nodes, edges) = (graph.node_count(), graph.edge_count());

    let (second, graph, _) = run_once(&input, &output, graph, 100);
    assert_eq!(second.failed, 0);
    assert!(second.triples_sent() > 0);
    assert_eq!(graph.node_count(), nodes);
    assert_eq!(graph.edge_count(), edges);
}

#[test]
fn test_batch_size_does_not_change_graph() {
    let dir = tempdir().unwrap();
    let input = write_records(dir.path());

    let (small, one, _) = run_once(&input, &dir.path().join("a.jsonl"), MemoryGraph::new(), 1);
    let (large, hundred, _) = run_once(&input, &dir.path().join("b.jsonl"), MemoryGraph::new(), 100);

    assert!(small.graph.batches > large.graph.batches);
    assert_eq!(
        one.edges().collect::<Vec<_>>(),
        hundred.edges().collect::<Vec<_>>()
    );
    assert_eq!(one.node_count(), hundred.node_count());
}

#[test]
fn test_output_is_deterministic() {
    let dir = tempdir().unwrap();
    let input = write_records(dir.path());
    let a = dir.path().join("a.jsonl");
    let b = dir.path().join("b.jsonl");

    run_once(&input, &a, MemoryGraph::new(), 100);
    run_once(&input, &b, MemoryGraph::new(), 7);
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}
